use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A literal value with its inferred type fixed at parse time.
///
/// The variant *is* the inferred type: compilers match on it exhaustively and
/// never coerce one kind into another.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Date(DateTime<Utc>),
    /// Array literal, compared against whole array values
    ///
    /// # Example
    /// ```text
    /// pbc = [true, true, false]
    /// ```
    Array(Vec<Literal>),
}

/// Kind of a [`Literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralType {
    Integer,
    Float,
    String,
    Boolean,
    Date,
    Array,
}

impl Literal {
    pub fn kind(&self) -> LiteralType {
        match self {
            Literal::Integer(_) => LiteralType::Integer,
            Literal::Float(_) => LiteralType::Float,
            Literal::String(_) => LiteralType::String,
            Literal::Boolean(_) => LiteralType::Boolean,
            Literal::Date(_) => LiteralType::Date,
            Literal::Array(_) => LiteralType::Array,
        }
    }
}

impl LiteralType {
    pub fn is_numeric(self) -> bool {
        matches!(self, LiteralType::Integer | LiteralType::Float)
    }

    /// Types with a total order usable by `<`, `<=`, `>`, `>=` and ranges.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            LiteralType::Integer | LiteralType::Float | LiteralType::String | LiteralType::Date
        )
    }

    /// Two types compare with each other under ordering operators.
    pub fn same_family(self, other: LiteralType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LiteralType::Integer => "integer",
            LiteralType::Float => "float",
            LiteralType::String => "string",
            LiteralType::Boolean => "boolean",
            LiteralType::Date => "date",
            LiteralType::Array => "array",
        })
    }
}

/// Prints the literal in query syntax, so the output lexes back to the same
/// literal.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Float(n) => write!(f, "{n:?}"),
            Literal::String(s) => {
                f.write_str("\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Literal::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
