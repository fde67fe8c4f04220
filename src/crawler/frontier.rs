//! Deduplicated record frontier
//!
//! The frontier is the single source of truth for "have we seen this app".
//! It is owned by one job and only touched from that job's execution
//! context, so it needs no internal locking. Every operation is
//! non-suspending, which means a cancelled task can never leave a merge
//! half-applied.

use crate::crawler::Record;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Frontier {
    records: HashMap<String, Record>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or merges a record
    ///
    /// Returns true if the id was absent immediately before the call. The
    /// caller uses that as the trigger for downstream expansion.
    pub fn upsert(&mut self, record: Record) -> bool {
        match self.records.get_mut(record.app_id()) {
            Some(existing) => {
                existing.merge(record);
                false
            }
            None => {
                self.records.insert(record.app_id().to_string(), record);
                true
            }
        }
    }

    /// Upserts a batch, returning the ids that were new
    pub fn upsert_all(&mut self, records: impl IntoIterator<Item = Record>) -> Vec<String> {
        let mut fresh = Vec::new();
        for record in records {
            let app_id = record.app_id().to_string();
            if self.upsert(record) {
                fresh.push(app_id);
            }
        }
        fresh
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.records.contains_key(app_id)
    }

    pub fn get(&self, app_id: &str) -> Option<&Record> {
        self.records.get(app_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lazy view over the current records
    ///
    /// Call again to restart; insertion order is not preserved.
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.values()
    }

    /// All ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Releases the storage held by the frontier
    pub fn release(&mut self) {
        self.records = HashMap::new();
    }
}
