use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer, optionally signed
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -10
    /// ```
    Integer(i64),

    /// Floating point number, decimal or scientific
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// -2.31e-5
    /// 1E3
    /// ```
    Float(f64),

    /// String literal enclosed in double quotes
    ///
    /// # Examples
    /// ```text
    /// "bulk"
    /// "say \"hi\""
    /// ```
    String(String),

    /// Boolean values
    ///
    /// # Examples
    /// ```text
    /// true
    /// False
    /// ```
    Boolean(bool),

    /// ISO-8601 date or date-time, normalized to UTC
    ///
    /// # Examples
    /// ```text
    /// 2021-05-01
    /// 2021-05-01T12:30:00Z
    /// 2021-05-01T12:30:00+02:00
    /// ```
    Date(DateTime<Utc>),

    // Identifiers
    /// Field path, dotted for nested attributes
    ///
    /// # Examples
    /// ```text
    /// energy
    /// derived.elements.H
    /// cell.0
    /// ```
    Identifier(String),

    // Keywords
    /// Logical AND (`and` or `&`)
    And,

    /// Logical OR (`or` or `|`)
    Or,

    /// Logical NOT (`not` or `!`)
    Not,

    /// Membership and range introducer
    ///
    /// # Examples
    /// ```text
    /// config_type in ["bulk", "surface"]
    /// n_atoms in 10..<20
    /// ```
    In,

    // Comparison
    /// Equality (`=` or `==`)
    Eq,

    /// Inequality (`!=`)
    NotEq,

    /// Less than
    Lt,

    /// Less than or equal
    LtEq,

    /// Greater than
    Gt,

    /// Greater than or equal
    GtEq,

    /// Regular expression match (`~=` or `~`)
    Regex,

    /// Range separator with per-bound inclusivity
    ///
    /// # Examples
    /// ```text
    /// 1..5       both bounds inclusive
    /// 1..<5      upper bound exclusive
    /// 1<..5      lower bound exclusive
    /// 1<..<5     both bounds exclusive
    /// ```
    Range {
        low_inclusive: bool,
        high_inclusive: bool,
    },

    // Delimiters
    /// Left parenthesis for grouping or quantifiers
    LParen,

    /// Right parenthesis
    RParen,

    /// Left bracket for lists and array literals
    LBracket,

    /// Right bracket
    RBracket,

    /// Comma separating list elements
    Comma,

    /// End of input
    Eof,
}

/// Coarse token classes, used in error messages and by tooling that only
/// cares about the lexical category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Boolean,
    Date,
    Keyword,
    Operator,
    Punctuation,
    Eof,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Integer(_) | Token::Float(_) => TokenKind::Number,
            Token::String(_) => TokenKind::String,
            Token::Boolean(_) => TokenKind::Boolean,
            Token::Date(_) => TokenKind::Date,
            Token::Identifier(_) => TokenKind::Identifier,
            Token::And | Token::Or | Token::Not | Token::In => TokenKind::Keyword,
            Token::Eq
            | Token::NotEq
            | Token::Lt
            | Token::LtEq
            | Token::Gt
            | Token::GtEq
            | Token::Regex
            | Token::Range { .. } => TokenKind::Operator,
            Token::LParen | Token::RParen | Token::LBracket | Token::RBracket | Token::Comma => {
                TokenKind::Punctuation
            }
            Token::Eof => TokenKind::Eof,
        }
    }

    /// Whether the token can start a literal value.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Token::Integer(_)
                | Token::Float(_)
                | Token::String(_)
                | Token::Boolean(_)
                | Token::Date(_)
                | Token::LBracket
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "number {n}"),
            Token::Float(n) => write!(f, "number {n:?}"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Boolean(b) => write!(f, "`{b}`"),
            Token::Date(d) => write!(f, "date {}", d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Token::Identifier(name) => write!(f, "field `{name}`"),
            Token::And => f.write_str("`and`"),
            Token::Or => f.write_str("`or`"),
            Token::Not => f.write_str("`not`"),
            Token::In => f.write_str("`in`"),
            Token::Eq => f.write_str("`=`"),
            Token::NotEq => f.write_str("`!=`"),
            Token::Lt => f.write_str("`<`"),
            Token::LtEq => f.write_str("`<=`"),
            Token::Gt => f.write_str("`>`"),
            Token::GtEq => f.write_str("`>=`"),
            Token::Regex => f.write_str("`~=`"),
            Token::Range {
                low_inclusive,
                high_inclusive,
            } => write!(
                f,
                "`{}..{}`",
                if *low_inclusive { "" } else { "<" },
                if *high_inclusive { "" } else { "<" }
            ),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::LBracket => f.write_str("`[`"),
            Token::RBracket => f.write_str("`]`"),
            Token::Comma => f.write_str("`,`"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}
