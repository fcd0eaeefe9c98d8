use std::{cmp::Ordering, ops::Bound};

use crate::{
    compile::Predicate,
    record::{Record, RecordId},
    value::Value,
};

use super::{FindOptions, SortDirection, SortKey, collection::Snapshot};

enum Order {
    /// Id order, evaluated one record at a time
    Natural { after: Option<RecordId> },
    /// Matching ids, already sorted
    Sorted { ids: Vec<RecordId>, next: usize },
}

/// Lazy iterator over the records matching a filter.
///
/// A cursor owns a snapshot of the collection taken when it was opened, so
/// later writes are invisible to it and dropping it half-way leaves nothing
/// behind.
pub struct Cursor {
    snapshot: Snapshot,
    predicate: Predicate,
    order: Order,
    skip: usize,
    remaining: Option<usize>,
}

impl Cursor {
    pub(crate) fn new(snapshot: Snapshot, predicate: Predicate, options: &FindOptions) -> Self {
        let order = if options.sort.is_empty() {
            Order::Natural { after: None }
        } else {
            let mut matching: Vec<&Record> = snapshot
                .values()
                .filter(|record| predicate.matches(record))
                .collect();
            matching.sort_by(|a, b| compare(a, b, &options.sort));
            Order::Sorted {
                ids: matching.iter().filter_map(|record| record.id).collect(),
                next: 0,
            }
        };

        Cursor {
            snapshot,
            predicate,
            order,
            skip: options.skip,
            remaining: options.limit,
        }
    }

    fn next_match(&mut self) -> Option<Record> {
        match &mut self.order {
            Order::Natural { after } => {
                let lower = match after {
                    Some(id) => Bound::Excluded(*id),
                    None => Bound::Unbounded,
                };
                let (id, record) = self
                    .snapshot
                    .range((lower, Bound::Unbounded))
                    .find(|(_, record)| self.predicate.matches(record))?;
                *after = Some(*id);
                Some(record.clone())
            }
            Order::Sorted { ids, next } => {
                let id = ids.get(*next)?;
                *next += 1;
                self.snapshot.get(id).cloned()
            }
        }
    }
}

impl Iterator for Cursor {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.remaining == Some(0) {
            return None;
        }
        while self.skip > 0 {
            self.next_match()?;
            self.skip -= 1;
        }
        let record = self.next_match()?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(record)
    }
}

/// Missing fields sort before every value, including null.
fn compare(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = sort_value(a, key);
        let right = sort_value(b, key);
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => l.sort_cmp(r),
        };
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.id.cmp(&b.id)
}

fn sort_value<'a>(record: &'a Record, key: &SortKey) -> Option<&'a Value> {
    record.resolve(&key.field).into_iter().next()
}
