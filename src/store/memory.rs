//! In-memory storage backend.
//!
//! Non-durable backend for tests and ephemeral stores. It enforces the same
//! duplicate/missing-key contract as the durable backend so the store
//! behaves identically over either medium.

use std::collections::BTreeMap;

use crate::record::Record;
use crate::store::traits::{StorageBackend, StorageError};

/// Storage backend that keeps records in process memory only.
#[derive(Debug, Default)]
pub struct MemoryBackend<R: Record> {
    records: BTreeMap<String, R>,
}

impl<R: Record> MemoryBackend<R> {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Creates a backend pre-seeded with records, as if previously persisted.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.key().to_string(), r))
                .collect(),
        }
    }
}

impl<R: Record> StorageBackend<R> for MemoryBackend<R> {
    fn load_all(&mut self) -> Result<Vec<R>, StorageError> {
        Ok(self.records.values().cloned().collect())
    }

    fn insert(&mut self, record: &R) -> Result<(), StorageError> {
        let key = record.key().to_string();
        if self.records.contains_key(&key) {
            return Err(StorageError::DuplicateKey(key));
        }
        self.records.insert(key, record.clone());
        Ok(())
    }

    fn update(&mut self, record: &R) -> Result<(), StorageError> {
        let key = record.key();
        if !self.records.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        self.records.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        if self.records.remove(key).is_none() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(())
    }
}
