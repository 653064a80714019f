//! Deduplicating record collection.

use std::collections::HashSet;

use crate::model::PackageRecord;

/// Ordered record collection with a global seen-set over package ids.
///
/// Identity is global across every source repository in a run, and the
/// first admitted record wins: a later source yielding an already-seen
/// id is silently dropped. Arrival order is preserved.
#[derive(Default)]
pub struct PackageIndex {
    seen: HashSet<String>,
    records: Vec<PackageRecord>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `record` unless its id was already seen. Returns whether
    /// the record entered the collection.
    pub fn admit(&mut self, record: PackageRecord) -> bool {
        if !self.seen.insert(record.id.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands the finished collection off, consuming the index.
    pub fn into_records(self) -> Vec<PackageRecord> {
        self.records
    }
}
