use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::ast::Token;

/// Location of a character in the query text.
///
/// `offset` counts characters from the start (0-based); `line` and `column`
/// are 1-based for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Malformed token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

/// A classified token together with the raw text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub text: String,
    pub position: Position,
}

/// Tokenizer over a filter expression.
///
/// The lexer is also an [`Iterator`] of `Result<Lexeme, LexError>`: it yields
/// every token up to and including [`Token::Eof`] and stops after the end of
/// input or the first error. Cloning it, or calling [`tokenize`] again on the
/// same text, restarts the sequence.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    finished: bool,
}

/// Lazily tokenize `text`.
pub fn tokenize(text: &str) -> Lexer {
    Lexer::new(text)
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn location(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, message: impl Into<String>, position: Position) -> LexError {
        LexError {
            message: message.into(),
            position,
        }
    }

    fn text_since(&self, start: Position) -> String {
        self.input[start.offset..self.position].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads a dotted path: identifier segments joined by `.`. Segments after
    /// the first may start with a digit (`cell.0`).
    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        loop {
            while let Some(ch) = self.current_char() {
                if ch.is_alphanumeric() || ch == '_' {
                    result.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }

            if self.current_char() == Some('.')
                && self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
            {
                result.push('.');
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.location();
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.location();
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('u') => {
                            result.push(self.read_unicode_escape(escape_at)?);
                            continue;
                        }
                        Some(other) => {
                            return Err(
                                self.error(format!("invalid escape sequence `\\{other}`"), escape_at)
                            );
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("unterminated string literal", start))
    }

    /// `\uXXXX`, positioned on the `u`.
    fn read_unicode_escape(&mut self, escape_at: Position) -> Result<char, LexError> {
        self.advance(); // Consume 'u'
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .current_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape", escape_at))?;
            code = code * 16 + digit;
            self.advance();
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape", escape_at))
    }

    fn read_digits(&mut self, number: &mut String) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Integer, decimal or scientific number with an optional sign. An
    /// unsigned run of exactly four digits followed by `-` and a digit is a
    /// date instead.
    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.location();
        let mut number = String::new();
        let mut is_float = false;

        if let Some(sign @ ('-' | '+')) = self.current_char() {
            number.push(sign);
            self.advance();
        }

        self.read_digits(&mut number);

        if number.len() == 4
            && number.starts_with(|c: char| c.is_ascii_digit())
            && self.current_char() == Some('-')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            return self.read_date(start);
        }

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            number.push('.');
            self.advance();
            self.read_digits(&mut number);
        }

        if let Some(e @ ('e' | 'E')) = self.current_char() {
            let signed = matches!(self.peek_char(1), Some('-' | '+'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                number.push(e);
                self.advance();
                if signed {
                    if let Some(sign) = self.current_char() {
                        number.push(sign);
                    }
                    self.advance();
                }
                self.read_digits(&mut number);
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Token::Float)
                .ok_or_else(|| self.error(format!("invalid number `{number}`"), start))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.error(format!("integer `{number}` out of range"), start))
        }
    }

    /// Reads the rest of `YYYY-MM-DD[THH:MM[:SS[.fff]]][Z|±HH:MM]`, with the
    /// year already consumed.
    fn read_date(&mut self, start: Position) -> Result<Token, LexError> {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '-' {
                self.advance();
            } else {
                break;
            }
        }

        if self.current_char() == Some('T') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while let Some(ch) = self.current_char() {
                let fraction = ch == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit());
                if ch.is_ascii_digit() || ch == ':' || fraction {
                    self.advance();
                } else {
                    break;
                }
            }
            match self.current_char() {
                Some('Z') => self.advance(),
                Some('+' | '-') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.advance();
                    while let Some(ch) = self.current_char() {
                        if ch.is_ascii_digit() || ch == ':' {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        let text = self.text_since(start);
        parse_date(&text)
            .map(Token::Date)
            .ok_or_else(|| self.error(format!("invalid date literal `{text}`"), start))
    }

    /// `..`, with an optional trailing `<` marking an exclusive upper bound.
    fn read_range(&mut self, low_inclusive: bool) -> Token {
        self.advance();
        self.advance();
        let high_inclusive = if self.current_char() == Some('<') {
            self.advance();
            false
        } else {
            true
        };
        Token::Range {
            low_inclusive,
            high_inclusive,
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.advance();
        self.advance();
        token
    }

    pub fn next_token(&mut self) -> Result<Lexeme, LexError> {
        self.skip_whitespace();
        let start = self.location();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some(',') => self.single(Token::Comma),
            Some('&') => {
                if self.peek_char(1) == Some('&') {
                    self.double(Token::And)
                } else {
                    self.single(Token::And)
                }
            }
            Some('|') => {
                if self.peek_char(1) == Some('|') {
                    self.double(Token::Or)
                } else {
                    self.single(Token::Or)
                }
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::Eq)
                } else {
                    self.single(Token::Eq)
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::NotEq)
                } else {
                    self.single(Token::Not)
                }
            }
            Some('~') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::Regex)
                } else {
                    self.single(Token::Regex)
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('.') && self.peek_char(2) == Some('.') {
                    self.advance();
                    self.read_range(false)
                } else if self.peek_char(1) == Some('=') {
                    self.double(Token::LtEq)
                } else {
                    self.single(Token::Lt)
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::GtEq)
                } else {
                    self.single(Token::Gt)
                }
            }
            Some('.') if self.peek_char(1) == Some('.') => self.read_range(true),
            Some('"') => Token::String(self.read_string()?),
            Some('-' | '+') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()?
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" | "True" => Token::Boolean(true),
                    "false" | "False" => Token::Boolean(false),
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) => return Err(self.error(format!("unexpected character `{ch}`"), start)),
        };

        Ok(Lexeme {
            text: self.text_since(start),
            token,
            position: start,
        })
    }
}

impl Iterator for Lexer {
    type Item = Result<Lexeme, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if matches!(&result, Err(_) | Ok(Lexeme { token: Token::Eof, .. })) {
            self.finished = true;
        }
        Some(result)
    }
}

/// Parses the date forms accepted by the lexer. Values without an offset are
/// taken as UTC.
pub(crate) fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(date) = DateTime::parse_from_str(text, format) {
            return Some(date.with_timezone(&Utc));
        }
    }
    let naive = text.strip_suffix('Z').unwrap_or(text);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

#[test]
fn test_keywords() {
    let tokens: Vec<Token> = tokenize("and or not in true false True False")
        .map(|lexeme| lexeme.unwrap().token)
        .collect();
    assert_eq!(
        tokens,
        vec![
            Token::And,
            Token::Or,
            Token::Not,
            Token::In,
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Eof,
        ]
    );
}

#[test]
fn test_range_forms() {
    let mut lexer = Lexer::new("1..5 1<..<5");
    assert_eq!(lexer.next_token().unwrap().token, Token::Integer(1));
    assert_eq!(
        lexer.next_token().unwrap().token,
        Token::Range {
            low_inclusive: true,
            high_inclusive: true
        }
    );
    assert_eq!(lexer.next_token().unwrap().token, Token::Integer(5));
    assert_eq!(lexer.next_token().unwrap().token, Token::Integer(1));
    assert_eq!(
        lexer.next_token().unwrap().token,
        Token::Range {
            low_inclusive: false,
            high_inclusive: false
        }
    );
    assert_eq!(lexer.next_token().unwrap().token, Token::Integer(5));
}

#[test]
fn test_position_tracking() {
    let mut lexer = Lexer::new("a = 1\n  and b");
    let positions: Vec<Position> = std::iter::from_fn(|| {
        let lexeme = lexer.next_token().unwrap();
        (lexeme.token != Token::Eof).then_some(lexeme.position)
    })
    .collect();
    assert_eq!(positions[3].line, 2);
    assert_eq!(positions[3].column, 3);
    assert_eq!(positions[4].offset, 12);
}
