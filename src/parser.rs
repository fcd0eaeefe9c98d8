use std::mem;

use thiserror::Error;

use crate::{
    ast::{Bound, CompareOp, FieldPath, FieldRef, Literal, Node, Quantifier, Token},
    error::QueryError,
    lexer::{Lexeme, Lexer, Position},
    types,
};

/// Parentheses, `not` and array literals deeper than this are rejected instead
/// of exhausting the stack.
const MAX_DEPTH: usize = 128;

/// Tallest tree a query may produce. Every operand of an `and`/`or` chain adds
/// a level, so this also bounds chain length.
const MAX_HEIGHT: usize = 256;

/// Malformed grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found} at {position}")]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub position: Position,
}

/// Recursive-descent parser over a [`Lexer`].
///
/// ```text
/// expr      := or_expr
/// or_expr   := and_expr ( "or" and_expr )*
/// and_expr  := not_expr ( "and" not_expr )*
/// not_expr  := "not" not_expr | primary
/// primary   := "(" expr ")" | predicate | literal "in" field
/// predicate := field [ op literal | "in" list | "in" low ".." high ]
/// ```
pub struct Parser {
    lexer: Lexer,
    current: Lexeme,
    depth: usize,
}

/// Parse a complete filter expression.
///
/// # Examples
///
/// ```
/// use abcd::parser::parse;
///
/// let tree = parse("energy < -10 and config_type ~= \"^bulk\"").unwrap();
/// assert_eq!(tree.to_string(), "energy < -10 and config_type ~= \"^bulk\"");
/// ```
pub fn parse(text: &str) -> Result<Node, QueryError> {
    let mut parser = Parser::new(Lexer::new(text))?;
    let node = parser.parse()?;
    tracing::debug!(query = %node, "parsed filter");
    Ok(node)
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, QueryError> {
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<Lexeme, QueryError> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.current, next))
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current.token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: impl Into<String>) -> QueryError {
        ParseError {
            expected: expected.into(),
            found: self.current.token.to_string(),
            position: self.current.position,
        }
        .into()
    }

    fn expect(&mut self, expected: Token) -> Result<Lexeme, QueryError> {
        if !self.check(&expected) {
            return Err(self.unexpected(expected.to_string()));
        }
        self.advance()
    }

    fn enter(&mut self) -> Result<(), QueryError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.unexpected(format!("at most {MAX_DEPTH} levels of nesting")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Rejects a node of `height` built at the operator `at`.
    fn check_height(height: usize, at: &Lexeme) -> Result<(), QueryError> {
        if height <= MAX_HEIGHT {
            return Ok(());
        }
        Err(ParseError {
            expected: format!("a filter at most {MAX_HEIGHT} levels tall"),
            found: at.token.to_string(),
            position: at.position,
        }
        .into())
    }

    /// Parse the whole input; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Node, QueryError> {
        if self.check(&Token::Eof) {
            return Err(self.unexpected("a filter expression"));
        }
        let node = self.parse_expression()?;
        if self.check(&Token::RParen) {
            return Err(self.unexpected("end of input (unbalanced parentheses)"));
        }
        if !self.check(&Token::Eof) {
            return Err(self.unexpected("`and`, `or` or end of input"));
        }
        Ok(node)
    }

    pub fn parse_expression(&mut self) -> Result<Node, QueryError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node, QueryError> {
        let mut left = self.parse_and()?;
        let mut height = left.height();

        while self.check(&Token::Or) {
            let operator = self.advance()?;
            let right = self.parse_and()?;
            height = height.max(right.height()) + 1;
            Self::check_height(height, &operator)?;
            left = Node::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, QueryError> {
        let mut left = self.parse_not()?;
        let mut height = left.height();

        while self.check(&Token::And) {
            let operator = self.advance()?;
            let right = self.parse_not()?;
            height = height.max(right.height()) + 1;
            Self::check_height(height, &operator)?;
            left = Node::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node, QueryError> {
        if self.check(&Token::Not) {
            let operator = self.advance()?;
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            Self::check_height(operand.height() + 1, &operator)?;
            return Ok(Node::not(operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, QueryError> {
        match &self.current.token {
            Token::LParen => {
                self.advance()?;
                self.enter()?;
                let node = self.parse_expression()?;
                self.leave();
                if !self.check(&Token::RParen) {
                    return Err(self.unexpected("`)` (unbalanced parentheses)"));
                }
                self.advance()?;
                Ok(node)
            }
            Token::Identifier(_) => {
                let field = self.parse_field_ref()?;
                self.parse_predicate(field)
            }
            token if token.is_literal() => self.parse_reversed_membership(),
            _ => Err(self.unexpected("a field name, a literal or `(`")),
        }
    }

    /// `field`, `any(field)` or `all(field)`.
    fn parse_field_ref(&mut self) -> Result<FieldRef, QueryError> {
        let name = match self.advance()?.token {
            Token::Identifier(name) => name,
            _ => unreachable!("caller checked for an identifier"),
        };

        let quantifier = match name.as_str() {
            "any" if self.check(&Token::LParen) => Quantifier::Any,
            "all" if self.check(&Token::LParen) => Quantifier::All,
            _ => {
                return Ok(FieldRef {
                    path: FieldPath::parse(&name),
                    quantifier: Quantifier::Any,
                });
            }
        };

        self.advance()?; // Consume '('
        let path = match &self.current.token {
            Token::Identifier(path) => FieldPath::parse(path),
            _ => return Err(self.unexpected(format!("a field name inside `{name}(...)`"))),
        };
        self.advance()?;
        self.expect(Token::RParen)?;

        Ok(FieldRef { path, quantifier })
    }

    fn parse_predicate(&mut self, field: FieldRef) -> Result<Node, QueryError> {
        let op = match self.current.token {
            Token::Eq => CompareOp::Eq,
            Token::NotEq => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::LtEq => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::GtEq => CompareOp::Ge,
            Token::Regex => CompareOp::Regex,
            Token::In => {
                self.advance()?;
                return if self.check(&Token::LBracket) {
                    self.parse_membership(field)
                } else {
                    self.parse_range(field)
                };
            }
            _ => return Ok(Node::exists(field)),
        };

        self.advance()?;
        let position = self.current.position;
        let value = self.parse_literal()?;
        types::check_comparison(&field, op, &value, position)?;

        if let (CompareOp::Regex, Literal::String(pattern)) = (op, &value)
            && let Err(reason) = types::compile_pattern(pattern)
        {
            return Err(ParseError {
                expected: "a valid regular expression".to_string(),
                found: format!("{pattern:?} ({})", summary(&reason)),
                position,
            }
            .into());
        }

        Ok(Node::comparison(field, op, value))
    }

    fn parse_membership(&mut self, field: FieldRef) -> Result<Node, QueryError> {
        self.advance()?; // Consume '['

        if self.check(&Token::RBracket) {
            return Err(self.unexpected("at least one value in the membership list"));
        }

        let mut values = vec![];
        while !self.check(&Token::RBracket) {
            let position = self.current.position;
            let value = self.parse_literal()?;
            types::check_membership_value(&value, position)?;
            values.push(value);
            self.separator()?;
        }

        self.advance()?; // Consume ']'
        Ok(Node::Membership { field, values })
    }

    fn parse_range(&mut self, field: FieldRef) -> Result<Node, QueryError> {
        let position = self.current.position;
        let low = self.parse_literal()?;

        let (low_inclusive, high_inclusive) = match self.current.token {
            Token::Range {
                low_inclusive,
                high_inclusive,
            } => (low_inclusive, high_inclusive),
            _ => return Err(self.unexpected("`..` between the range bounds")),
        };
        self.advance()?;

        let high = self.parse_literal()?;
        let low = Bound {
            value: low,
            inclusive: low_inclusive,
        };
        let high = Bound {
            value: high,
            inclusive: high_inclusive,
        };
        types::check_range(&low, &high, position)?;

        Ok(Node::Range { field, low, high })
    }

    /// `22 in forces_count` is the same predicate as `forces_count = 22`.
    fn parse_reversed_membership(&mut self) -> Result<Node, QueryError> {
        let position = self.current.position;
        let value = self.parse_literal()?;
        self.expect(Token::In)?;
        if !matches!(self.current.token, Token::Identifier(_)) {
            return Err(self.unexpected("a field name after `in`"));
        }
        let field = self.parse_field_ref()?;
        types::check_comparison(&field, CompareOp::Eq, &value, position)?;
        Ok(Node::comparison(field, CompareOp::Eq, value))
    }

    fn parse_literal(&mut self) -> Result<Literal, QueryError> {
        match &self.current.token {
            Token::Integer(_)
            | Token::Float(_)
            | Token::String(_)
            | Token::Boolean(_)
            | Token::Date(_) => {}
            Token::LBracket => return self.parse_array_literal(),
            _ => return Err(self.unexpected("a literal value")),
        }

        Ok(match self.advance()?.token {
            Token::Integer(n) => Literal::Integer(n),
            Token::Float(n) => Literal::Float(n),
            Token::String(s) => Literal::String(s),
            Token::Boolean(b) => Literal::Boolean(b),
            Token::Date(d) => Literal::Date(d),
            _ => unreachable!("matched above"),
        })
    }

    fn parse_array_literal(&mut self) -> Result<Literal, QueryError> {
        self.advance()?; // Consume '['
        self.enter()?;

        let mut elements = vec![];
        while !self.check(&Token::RBracket) {
            elements.push(self.parse_literal()?);
            self.separator()?;
        }

        self.advance()?; // Consume ']'
        self.leave();
        Ok(Literal::Array(elements))
    }

    /// List elements are separated by commas, though a bare space between
    /// literals is accepted too.
    fn separator(&mut self) -> Result<(), QueryError> {
        if self.check(&Token::Comma) {
            self.advance()?;
            if self.check(&Token::RBracket) {
                return Err(self.unexpected("a literal value after `,`"));
            }
            return Ok(());
        }
        if self.check(&Token::RBracket) || self.current.token.is_literal() {
            return Ok(());
        }
        Err(self.unexpected("`,` or `]`"))
    }
}

fn summary(message: &str) -> &str {
    message.lines().last().unwrap_or(message).trim()
}
