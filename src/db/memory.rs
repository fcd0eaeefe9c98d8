use crate::compile::{Backend, Predicate};

use super::{BackendError, Collection, Database};

/// In-process store running compiled predicates directly.
#[derive(Debug)]
pub struct MemoryStore {
    collection: Collection,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryStore {
            collection: Collection::new(name, Backend::Memory),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new("atoms")
    }
}

impl Database for MemoryStore {
    type Filter = Predicate;

    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn collection(&self) -> &Collection {
        &self.collection
    }

    fn prepare(&self, filter: &Predicate) -> Result<Predicate, BackendError> {
        Ok(filter.clone())
    }
}
