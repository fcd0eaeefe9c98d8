//! Error types shared across the crate.
//!
//! Each stage defines its own error next to its code; this module groups the
//! text-stage errors into [`QueryError`] and everything into [`Error`].

use thiserror::Error;

use crate::{
    compile::UnsupportedOperationError,
    config::ConfigError,
    db::BackendError,
    lexer::{LexError, Position},
    parser::ParseError,
    types::TypeError,
};

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure turning query text into a tree. Always carries a source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl QueryError {
    pub fn position(&self) -> Position {
        match self {
            QueryError::Lex(e) => e.position,
            QueryError::Parse(e) => e.position,
            QueryError::Type(e) => e.position(),
        }
    }
}

/// Errors that can occur in any crate operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<LexError> for Error {
    fn from(e: LexError) -> Self {
        Error::Query(e.into())
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Query(e.into())
    }
}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Query(e.into())
    }
}
