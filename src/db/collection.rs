use std::{
    collections::BTreeMap,
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;

use crate::{
    compile::{Backend, Predicate},
    record::{Record, RecordId},
    value::Value,
};

use super::{
    BackendError, FindOptions, Patch,
    aggregate::{self, Aggregation, Row},
    cursor::Cursor,
};

pub(crate) type Snapshot = Arc<BTreeMap<RecordId, Record>>;

/// Records of one store, keyed by id.
///
/// Readers clone the `Arc` and work on that snapshot without holding the
/// lock; writers copy the map only while a snapshot is still shared.
#[derive(Debug)]
pub struct Collection {
    name: String,
    backend: Backend,
    records: RwLock<Snapshot>,
    next_id: AtomicU64,
    open: AtomicBool,
}

impl Collection {
    pub fn new(name: impl Into<String>, backend: Backend) -> Self {
        Collection {
            name: name.into(),
            backend,
            records: RwLock::new(Arc::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
            open: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        tracing::info!(backend = %self.backend, collection = %self.name, "store closed");
    }

    pub fn reopen(&self) {
        self.open.store(true, Ordering::Release);
        tracing::info!(backend = %self.backend, collection = %self.name, "store reopened");
    }

    pub fn ensure_open(&self) -> Result<(), BackendError> {
        if self.is_open() {
            return Ok(());
        }
        tracing::warn!(backend = %self.backend, collection = %self.name, "store is offline");
        Err(BackendError::unavailable(
            self.backend,
            format!("collection '{}' is closed", self.name),
        ))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Backend type, collection name and record count.
    pub fn info(&self) -> Result<Row, BackendError> {
        self.ensure_open()?;
        let count = i64::try_from(self.len()).unwrap_or(i64::MAX);
        Ok(Row::from([
            ("type".to_string(), Value::from(self.backend.name())),
            ("name".to_string(), Value::from(self.name.as_str())),
            ("count".to_string(), Value::Integer(count)),
        ]))
    }

    /// Drops every record. Ids are never reused, and open cursors keep their
    /// snapshot.
    pub fn destroy(&self) -> Result<usize, BackendError> {
        self.ensure_open()?;
        let dropped = mem::take(&mut *self.records.write()).len();
        tracing::info!(backend = %self.backend, collection = %self.name, dropped, "destroyed collection");
        Ok(dropped)
    }

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.records.read())
    }

    fn assign(&self, mut record: Record) -> (RecordId, Record) {
        let id = RecordId(self.next_id.fetch_add(1, Ordering::Relaxed));
        record.id = Some(id);
        (id, record)
    }

    pub fn insert(&self, record: Record) -> Result<RecordId, BackendError> {
        self.ensure_open()?;
        let (id, record) = self.assign(record);
        Arc::make_mut(&mut self.records.write()).insert(id, record);
        tracing::info!(backend = %self.backend, collection = %self.name, id = %id, "inserted record");
        Ok(id)
    }

    pub fn insert_many<I>(&self, records: I) -> Result<Vec<RecordId>, BackendError>
    where
        I: IntoIterator<Item = Record>,
    {
        self.ensure_open()?;
        let records: Vec<(RecordId, Record)> =
            records.into_iter().map(|record| self.assign(record)).collect();
        let ids: Vec<RecordId> = records.iter().map(|(id, _)| *id).collect();

        let mut guard = self.records.write();
        Arc::make_mut(&mut guard).extend(records);
        drop(guard);

        tracing::info!(backend = %self.backend, collection = %self.name, count = ids.len(), "inserted records");
        Ok(ids)
    }

    pub fn find(&self, predicate: Predicate, options: &FindOptions) -> Result<Cursor, BackendError> {
        self.ensure_open()?;
        Ok(Cursor::new(self.snapshot(), predicate, options))
    }

    pub fn count(&self, predicate: &Predicate) -> Result<usize, BackendError> {
        self.ensure_open()?;
        Ok(self
            .snapshot()
            .values()
            .filter(|record| predicate.matches(record))
            .count())
    }

    pub fn update(&self, predicate: &Predicate, patch: &Patch) -> Result<usize, BackendError> {
        self.ensure_open()?;
        let mut guard = self.records.write();
        let ids: Vec<RecordId> = guard
            .iter()
            .filter(|(_, record)| predicate.matches(record))
            .map(|(id, _)| *id)
            .collect();

        let mut modified = 0;
        if !ids.is_empty() && !patch.is_empty() {
            let records = Arc::make_mut(&mut guard);
            for id in ids {
                if let Some(record) = records.get_mut(&id)
                    && patch.apply(record)
                {
                    modified += 1;
                }
            }
        }
        drop(guard);

        tracing::info!(backend = %self.backend, collection = %self.name, modified, "updated records");
        Ok(modified)
    }

    pub fn remove(&self, predicate: &Predicate) -> Result<usize, BackendError> {
        self.ensure_open()?;
        let mut guard = self.records.write();
        let before = guard.len();
        if guard.values().any(|record| predicate.matches(record)) {
            Arc::make_mut(&mut guard).retain(|_, record| !predicate.matches(record));
        }
        let removed = before - guard.len();
        drop(guard);

        tracing::info!(backend = %self.backend, collection = %self.name, removed, "removed records");
        Ok(removed)
    }

    pub fn aggregate(
        &self,
        predicate: &Predicate,
        aggregation: &Aggregation,
    ) -> Result<Vec<Row>, BackendError> {
        self.ensure_open()?;
        let snapshot = self.snapshot();
        let matching = snapshot.values().filter(|record| predicate.matches(record));
        Ok(aggregate::run(matching, aggregation))
    }
}
