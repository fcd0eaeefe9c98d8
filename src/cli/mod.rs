//! CLI support for abcd
//!
//! Provides programmatic access to the `abcd` command's functionality so it
//! can be embedded in other tools and tested without a process.

mod check;
mod convert;
mod docs;
mod find;

pub use check::{CheckFormat, CheckOptions, CheckResult, execute_check, execute_compile};
pub use convert::load_records;
pub use docs::{DocCategory, get_doc_category, get_docs_overview};
pub use find::{QueryOptions, execute_count, execute_find, parse_sort};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Query, compile, store or configuration failure
    #[error(transparent)]
    Abcd(#[from] crate::Error),

    /// JSON parsing error
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No input provided
    #[error("no input provided. Use --input or pipe JSON records to stdin.")]
    NoInput,

    /// Input value that is not a JSON object
    #[error("record {index} is not a JSON object")]
    InvalidRecord { index: usize },

    /// Malformed `--sort` key
    #[error("invalid sort key '{0}'")]
    InvalidSort(String),

    /// Unknown documentation category
    #[error("unknown category: '{0}'\nRun 'abcd docs' to see available categories.")]
    UnknownCategory(String),
}

impl From<crate::QueryError> for CliError {
    fn from(e: crate::QueryError) -> Self {
        CliError::Abcd(e.into())
    }
}

impl From<crate::UnsupportedOperationError> for CliError {
    fn from(e: crate::UnsupportedOperationError) -> Self {
        CliError::Abcd(e.into())
    }
}
