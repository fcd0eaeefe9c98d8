//! Backend compilers.
//!
//! Each compiler walks a checked [`Node`] tree and produces the native filter
//! of one backend. The set of backends is closed; [`compile`] dispatches on
//! [`Backend`] and wraps the output in the matching [`Compiled`] variant.

pub mod document;
pub mod memory;
pub mod search;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use document::DocumentCompiler;
pub use memory::{MemoryCompiler, Predicate};
pub use search::SearchCompiler;

use crate::{ast::Node, config::Config};

/// Target storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum), value(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// In-process predicate, the reference semantics
    #[default]
    Memory,
    /// Mongo-style JSON filter documents
    DocumentStore,
    /// OpenSearch-style query DSL
    SearchIndex,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::DocumentStore => "document_store",
            Backend::SearchIndex => "search_index",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tree uses a construct the target backend cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the {backend} backend does not support {construct}")]
pub struct UnsupportedOperationError {
    pub backend: Backend,
    /// The offending construct, e.g. "the `~=` operator".
    pub construct: String,
}

impl UnsupportedOperationError {
    pub fn new(backend: Backend, construct: impl Into<String>) -> Self {
        UnsupportedOperationError {
            backend,
            construct: construct.into(),
        }
    }
}

/// A visitor turning a checked tree into one backend's native filter.
///
/// Compilers are pure: the same tree always yields the same output, and the
/// tree is never modified.
pub trait Compile {
    type Output;

    fn compile(&self, node: &Node) -> Result<Self::Output, UnsupportedOperationError>;

    /// Filter selecting every record, used when no query is given.
    fn match_all(&self) -> Self::Output;
}

/// A compiled filter tagged with its backend.
#[derive(Debug, Clone)]
pub enum Compiled {
    Predicate(Predicate),
    Document(serde_json::Value),
    Search(serde_json::Value),
}

impl Compiled {
    pub fn backend(&self) -> Backend {
        match self {
            Compiled::Predicate(_) => Backend::Memory,
            Compiled::Document(_) => Backend::DocumentStore,
            Compiled::Search(_) => Backend::SearchIndex,
        }
    }

    /// JSON form of the native filter; `None` for in-process predicates.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Compiled::Predicate(_) => None,
            Compiled::Document(json) | Compiled::Search(json) => Some(json),
        }
    }
}

/// Compile `node` (or the match-all filter when `None`) for `backend`.
pub fn compile(
    node: Option<&Node>,
    backend: Backend,
    config: &Config,
) -> Result<Compiled, UnsupportedOperationError> {
    fn run<C: Compile>(compiler: &C, node: Option<&Node>) -> Result<C::Output, UnsupportedOperationError> {
        match node {
            Some(node) => compiler.compile(node),
            None => Ok(compiler.match_all()),
        }
    }

    let compiled = match backend {
        Backend::Memory => Compiled::Predicate(run(&MemoryCompiler, node)?),
        Backend::DocumentStore => Compiled::Document(run(&DocumentCompiler, node)?),
        Backend::SearchIndex => {
            let compiler = SearchCompiler::new(config.search.keyword_suffix.clone());
            Compiled::Search(run(&compiler, node)?)
        }
    };

    match compiled.as_json() {
        Some(json) => tracing::debug!(%backend, filter = %json, "compiled filter"),
        None => tracing::debug!(%backend, "compiled predicate"),
    }
    Ok(compiled)
}
