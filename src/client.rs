//! The `Abcd` facade: query text in, records out.

use crate::{
    ast::Node,
    compile::{self, Backend, Compiled, UnsupportedOperationError},
    config::Config,
    db::{
        Aggregation, Cursor, Database, DocumentStore, FindOptions, MemoryStore, Patch, Row,
        SearchIndex,
    },
    error::Result,
    parser,
    record::{Record, RecordId},
};

/// The store behind an [`Abcd`] handle, one per backend.
#[derive(Debug)]
pub enum Store {
    Memory(MemoryStore),
    Document(DocumentStore),
    Search(SearchIndex),
}

impl Store {
    fn for_config(config: &Config) -> Self {
        match config.backend {
            Backend::Memory => Store::Memory(MemoryStore::new(config.document.collection.clone())),
            Backend::DocumentStore => {
                Store::Document(DocumentStore::new(config.document.collection.clone()))
            }
            Backend::SearchIndex => Store::Search(SearchIndex::new(
                config.search.index.clone(),
                config.search.keyword_suffix.clone(),
            )),
        }
    }
}

/// Runs `$body` against the store with the filter compiled for it.
macro_rules! with_filter {
    ($self:ident, $query:expr, |$db:ident, $filter:ident| $body:expr) => {{
        let compiled = $self.compile($query)?;
        match (&$self.store, &compiled) {
            (Store::Memory($db), Compiled::Predicate($filter)) => Ok($body?),
            (Store::Document($db), Compiled::Document($filter)) => Ok($body?),
            (Store::Search($db), Compiled::Search($filter)) => Ok($body?),
            _ => Err(UnsupportedOperationError::new(
                $self.backend(),
                format!("a filter compiled for the {} backend", compiled.backend()),
            )
            .into()),
        }
    }};
}

/// A handle on one configured store.
///
/// Every query-taking call parses the text once, compiles it once for the
/// active backend and executes it; a `None` or blank query selects every
/// record.
///
/// # Examples
///
/// ```
/// use abcd::{Abcd, Config, Record, Value};
///
/// let db = Abcd::open(Config::default()).unwrap();
/// db.insert(Record::new().with("n_atoms", Value::Integer(8))).unwrap();
/// db.insert(Record::new().with("n_atoms", Value::Integer(64))).unwrap();
///
/// assert_eq!(db.count(Some("n_atoms in 1..10")).unwrap(), 1);
/// assert_eq!(db.count(None).unwrap(), 2);
/// ```
#[derive(Debug)]
pub struct Abcd {
    config: Config,
    store: Store,
}

impl Abcd {
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = Store::for_config(&config);
        tracing::info!(backend = %config.backend, "opened store");
        Ok(Abcd { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Parses query text; `None` for an absent or blank query.
    pub fn parse(&self, query: Option<&str>) -> Result<Option<Node>> {
        match query.map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => Ok(Some(parser::parse(text)?)),
        }
    }

    /// Parses and compiles query text for the active backend.
    pub fn compile(&self, query: Option<&str>) -> Result<Compiled> {
        let node = self.parse(query)?;
        Ok(compile::compile(node.as_ref(), self.backend(), &self.config)?)
    }

    pub fn insert(&self, record: Record) -> Result<RecordId> {
        let id = match &self.store {
            Store::Memory(db) => db.insert(record),
            Store::Document(db) => db.insert(record),
            Store::Search(db) => db.insert(record),
        }?;
        Ok(id)
    }

    pub fn insert_many<I>(&self, records: I) -> Result<Vec<RecordId>>
    where
        I: IntoIterator<Item = Record>,
    {
        let ids = match &self.store {
            Store::Memory(db) => db.insert_many(records),
            Store::Document(db) => db.insert_many(records),
            Store::Search(db) => db.insert_many(records),
        }?;
        Ok(ids)
    }

    /// Matching records. The configured `query.default_limit` applies when
    /// `options` sets no limit.
    pub fn find(&self, query: Option<&str>, options: FindOptions) -> Result<Cursor> {
        let mut options = options;
        if options.limit.is_none() {
            options.limit = self.config.query.default_limit;
        }
        with_filter!(self, query, |db, filter| db.find(filter, &options))
    }

    pub fn count(&self, query: Option<&str>) -> Result<usize> {
        with_filter!(self, query, |db, filter| db.count(filter))
    }

    pub fn update(&self, query: Option<&str>, patch: &Patch) -> Result<usize> {
        with_filter!(self, query, |db, filter| db.update(filter, patch))
    }

    pub fn remove(&self, query: Option<&str>) -> Result<usize> {
        with_filter!(self, query, |db, filter| db.remove(filter))
    }

    pub fn aggregate(&self, query: Option<&str>, aggregation: &Aggregation) -> Result<Vec<Row>> {
        with_filter!(self, query, |db, filter| db.aggregate(filter, aggregation))
    }

    pub fn info(&self) -> Result<Row> {
        Ok(match &self.store {
            Store::Memory(db) => db.info()?,
            Store::Document(db) => db.info()?,
            Store::Search(db) => db.info()?,
        })
    }

    /// Drops every record in the store.
    pub fn destroy(&self) -> Result<usize> {
        Ok(match &self.store {
            Store::Memory(db) => db.destroy()?,
            Store::Document(db) => db.destroy()?,
            Store::Search(db) => db.destroy()?,
        })
    }

    pub fn close(&self) {
        match &self.store {
            Store::Memory(db) => db.close(),
            Store::Document(db) => db.close(),
            Store::Search(db) => db.close(),
        }
    }

    pub fn reopen(&self) {
        match &self.store {
            Store::Memory(db) => db.reopen(),
            Store::Document(db) => db.reopen(),
            Store::Search(db) => db.reopen(),
        }
    }
}
