//! Database interface
//!
//! A [`Database`] executes one backend's native filter against a record
//! collection. Three in-process stores share a [`Collection`]:
//!
//! - [`MemoryStore`] runs compiled [`Predicate`]s directly.
//! - [`DocumentStore`] interprets Mongo-style filter documents.
//! - [`SearchIndex`] interprets the query DSL subset the search compiler
//!   emits.
//!
//! Each store turns its native filter into a predicate in [`Database::prepare`],
//! rejecting filters it cannot run with [`BackendError::Query`]; the shared
//! operations are provided methods on the trait.

pub mod aggregate;
pub mod collection;
pub mod cursor;
pub mod document;
pub mod memory;
pub mod search;

use thiserror::Error;

pub use aggregate::{Aggregation, Row};
pub use collection::Collection;
pub use cursor::Cursor;
pub use document::DocumentStore;
pub use memory::MemoryStore;
pub use search::SearchIndex;

use crate::{
    ast::FieldPath,
    compile::{Backend, Predicate},
    record::{Record, RecordId},
    value::Value,
};

/// Failures raised by a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The store rejected the filter it was given.
    #[error("{backend} rejected the query: {message}")]
    Query { backend: Backend, message: String },

    /// The store cannot be reached.
    #[error("{backend} is unavailable: {message}")]
    Unavailable { backend: Backend, message: String },
}

impl BackendError {
    pub fn query(backend: Backend, message: impl Into<String>) -> Self {
        BackendError::Query {
            backend,
            message: message.into(),
        }
    }

    pub fn unavailable(backend: Backend, message: impl Into<String>) -> Self {
        BackendError::Unavailable {
            backend,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: FieldPath,
    pub direction: SortDirection,
}

/// Paging and ordering of a `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub limit: Option<usize>,
    pub skip: usize,
    pub sort: Vec<SortKey>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn sort_by(mut self, field: impl Into<FieldPath>, direction: SortDirection) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Property edits applied by `update`, in the order set, unset, rename.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub set: Vec<(FieldPath, Value)>,
    pub unset: Vec<FieldPath>,
    pub rename: Vec<(FieldPath, FieldPath)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<FieldPath>) -> Self {
        self.unset.push(field.into());
        self
    }

    pub fn rename(mut self, from: impl Into<FieldPath>, to: impl Into<FieldPath>) -> Self {
        self.rename.push((from.into(), to.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.rename.is_empty()
    }

    /// Applies the edits; returns whether the record changed.
    pub fn apply(&self, record: &mut Record) -> bool {
        let before = record.fields.clone();
        for (field, value) in &self.set {
            record.set_path(field, value.clone());
        }
        for field in &self.unset {
            record.remove_path(field);
        }
        for (from, to) in &self.rename {
            if let Some(value) = record.remove_path(from)
                && !record.set_path(to, value.clone())
            {
                // Target not addressable; keep the value where it was.
                record.set_path(from, value);
            }
        }
        record.fields != before
    }
}

/// A store executing one backend's native filters.
///
/// Implementors supply the collection and [`prepare`](Database::prepare); all
/// record operations are provided. Every operation fails with
/// [`BackendError::Unavailable`] while the store is closed.
pub trait Database {
    /// Native filter type.
    type Filter;

    fn backend(&self) -> Backend;

    fn collection(&self) -> &Collection;

    /// Validates a native filter and turns it into an executable predicate.
    fn prepare(&self, filter: &Self::Filter) -> Result<Predicate, BackendError>;

    fn insert(&self, record: Record) -> Result<RecordId, BackendError> {
        self.collection().insert(record)
    }

    fn insert_many<I>(&self, records: I) -> Result<Vec<RecordId>, BackendError>
    where
        I: IntoIterator<Item = Record>,
        Self: Sized,
    {
        self.collection().insert_many(records)
    }

    /// Matching records as a lazy cursor over a snapshot of the collection.
    fn find(&self, filter: &Self::Filter, options: &FindOptions) -> Result<Cursor, BackendError> {
        self.collection().ensure_open()?;
        let predicate = self.prepare(filter)?;
        self.collection().find(predicate, options)
    }

    fn count(&self, filter: &Self::Filter) -> Result<usize, BackendError> {
        self.collection().ensure_open()?;
        let predicate = self.prepare(filter)?;
        self.collection().count(&predicate)
    }

    /// Applies `patch` to every matching record; returns how many changed.
    fn update(&self, filter: &Self::Filter, patch: &Patch) -> Result<usize, BackendError> {
        self.collection().ensure_open()?;
        let predicate = self.prepare(filter)?;
        self.collection().update(&predicate, patch)
    }

    /// Deletes every matching record; returns how many were removed.
    fn remove(&self, filter: &Self::Filter) -> Result<usize, BackendError> {
        self.collection().ensure_open()?;
        let predicate = self.prepare(filter)?;
        self.collection().remove(&predicate)
    }

    fn aggregate(
        &self,
        filter: &Self::Filter,
        aggregation: &Aggregation,
    ) -> Result<Vec<Row>, BackendError> {
        self.collection().ensure_open()?;
        let predicate = self.prepare(filter)?;
        self.collection().aggregate(&predicate, aggregation)
    }

    /// Backend type, collection name and record count as one row.
    fn info(&self) -> Result<Row, BackendError> {
        self.collection().info()
    }

    /// Drops every record; returns how many were dropped.
    fn destroy(&self) -> Result<usize, BackendError> {
        self.collection().destroy()
    }

    /// Takes the store offline. Open cursors keep their snapshot.
    fn close(&self) {
        self.collection().close();
    }

    fn reopen(&self) {
        self.collection().reopen();
    }

    fn is_open(&self) -> bool {
        self.collection().is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_sets_unsets_and_renames() {
        let mut record = Record::new()
            .with("energy", Value::Float(-1.0))
            .with("tmp", Value::Boolean(true));
        let patch = Patch::new()
            .set("info.source", "vasp")
            .unset("tmp")
            .rename("energy", "total_energy");

        assert!(patch.apply(&mut record));
        assert_eq!(record.get("total_energy"), Some(&Value::Float(-1.0)));
        assert!(record.get("energy").is_none());
        assert!(record.get("tmp").is_none());
        assert_eq!(
            record.resolve(&FieldPath::parse("info.source")),
            vec![&Value::from("vasp")]
        );

        assert!(!Patch::new().unset("missing").apply(&mut record));
    }
}
