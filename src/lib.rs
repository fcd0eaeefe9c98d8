//! Query language and backend compilers for an atomistic structure database.
//!
//! Query text is lexed, parsed into a typed [`Node`] tree, then compiled for
//! one of three backends: an in-process [`Predicate`], a Mongo-style filter
//! document, or an OpenSearch-style query. The [`db`] module executes those
//! filters against in-process stores and [`Abcd`] ties the pipeline together.
//!
//! ```
//! use abcd::{Backend, Config, compile, parse};
//!
//! let tree = parse("n_atoms in 8..<64 and not pbc = false").unwrap();
//! let filter = compile::compile(Some(&tree), Backend::DocumentStore, &Config::default()).unwrap();
//! assert!(filter.as_json().is_some());
//! ```

pub mod ast;
pub mod client;
pub mod compile;
pub mod config;
pub mod convert;
pub mod db;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod record;
pub mod types;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Bound, CompareOp, FieldPath, FieldRef, Literal, LiteralType, Node, Quantifier, Token};
pub use client::{Abcd, Store};
pub use compile::{Backend, Compile, Compiled, Predicate, UnsupportedOperationError};
pub use config::{Config, ConfigError};
pub use db::{
    Aggregation, BackendError, Cursor, Database, DocumentStore, FindOptions, MemoryStore, Patch,
    Row, SearchIndex, SortDirection,
};
pub use error::{Error, QueryError, Result};
pub use lexer::{LexError, Lexer, Position, tokenize};
pub use parser::{ParseError, Parser, parse};
pub use record::{Record, RecordId};
pub use types::TypeError;
pub use value::Value;
