//! Journal-backed storage backend.
//!
//! Wraps a [`Journal`] plus the directory lock into a [`StorageBackend`]:
//! `load_all` replays the journal into the current record set, each mutation
//! appends one entry, and the journal is rewritten from live records once it
//! grows past its size budget.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::record::Record;
use crate::store::traits::{StorageBackend, StorageError};

use super::file_lock::DirLock;
use super::log::{Journal, JournalOp};
use super::JournalConfig;

/// Name of the journal file inside a store directory.
const JOURNAL_FILE: &str = "store.journal";

/// Durable storage backend: an exclusive store directory holding an
/// append-only journal.
#[derive(Debug)]
pub struct JournalBackend<R: Record> {
    dir: PathBuf,
    _lock: DirLock,
    journal: Journal<R>,
    config: JournalConfig,
}

impl<R: Record> JournalBackend<R> {
    /// Opens or creates the store directory and its journal.
    ///
    /// # Errors
    /// [`StorageError::Unavailable`] if the directory cannot be created,
    /// another process holds the lock, or the journal cannot be opened.
    pub fn open(dir: &Path, config: JournalConfig) -> Result<Self, StorageError> {
        let config = config.validate()?;

        fs::create_dir_all(dir).map_err(|e| {
            StorageError::Unavailable(format!(
                "failed to create store directory {}: {e}",
                dir.display()
            ))
        })?;

        let lock = DirLock::acquire(dir).map_err(|e| {
            StorageError::Unavailable(format!("failed to lock {}: {e}", dir.display()))
        })?;

        let journal =
            Journal::open(&dir.join(JOURNAL_FILE), config.sync_on_write).map_err(|e| {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    StorageError::Corruption(format!("journal is corrupt: {e}"))
                } else {
                    StorageError::Unavailable(format!("failed to open journal: {e}"))
                }
            })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            journal,
            config,
        })
    }

    /// The store directory this backend owns.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<R: Record> StorageBackend<R> for JournalBackend<R> {
    fn load_all(&mut self) -> Result<Vec<R>, StorageError> {
        let iter = self.journal.iter()?;

        let mut records: BTreeMap<String, R> = BTreeMap::new();
        let mut replayed = 0u64;
        for entry in iter {
            let entry = entry.map_err(|e| {
                StorageError::Corruption(format!("journal replay failed: {e}"))
            })?;
            replayed += 1;

            match entry.op {
                JournalOp::Insert(record) => {
                    let key = record.key().to_string();
                    if records.insert(key.clone(), record).is_some() {
                        return Err(StorageError::Corruption(format!(
                            "journal inserts key '{key}' twice without a delete"
                        )));
                    }
                }
                JournalOp::Update(record) => {
                    let key = record.key().to_string();
                    if records.insert(key.clone(), record).is_none() {
                        return Err(StorageError::Corruption(format!(
                            "journal updates unknown key '{key}'"
                        )));
                    }
                }
                JournalOp::Delete { key } => {
                    if records.remove(&key).is_none() {
                        return Err(StorageError::Corruption(format!(
                            "journal deletes unknown key '{key}'"
                        )));
                    }
                }
            }
        }

        debug!(
            dir = %self.dir.display(),
            entries = replayed,
            records = records.len(),
            "journal replayed"
        );

        Ok(records.into_values().collect())
    }

    fn insert(&mut self, record: &R) -> Result<(), StorageError> {
        self.journal.append(JournalOp::Insert(record.clone()))?;
        Ok(())
    }

    fn update(&mut self, record: &R) -> Result<(), StorageError> {
        self.journal.append(JournalOp::Update(record.clone()))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.journal.append(JournalOp::Delete {
            key: key.to_string(),
        })?;
        Ok(())
    }

    fn wants_compaction(&self) -> bool {
        self.journal
            .size_bytes()
            .map(|size| size > self.config.max_journal_size)
            .unwrap_or(false)
    }

    fn compact(&mut self, records: &[R]) -> Result<(), StorageError> {
        let before = self.journal.size_bytes().unwrap_or(0);
        self.journal.rewrite(records)?;
        let after = self.journal.size_bytes().unwrap_or(0);
        debug!(
            dir = %self.dir.display(),
            before, after,
            records = records.len(),
            "journal compacted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Kv {
        k: String,
        v: i64,
    }

    impl Record for Kv {
        type Patch = ();

        fn key(&self) -> &str {
            &self.k
        }

        fn search_text(&self) -> Vec<&str> {
            vec![&self.k]
        }

        fn validate(&self) -> Result<(), ValidationError> {
            Ok(())
        }

        fn apply(&mut self, (): ()) {}
    }

    fn kv(k: &str, v: i64) -> Kv {
        Kv {
            k: k.to_string(),
            v,
        }
    }

    #[test]
    fn test_mutations_replay_across_reopen() {
        let dir = tempdir().unwrap();

        {
            let mut backend: JournalBackend<Kv> =
                JournalBackend::open(dir.path(), JournalConfig::default()).unwrap();
            assert!(backend.load_all().unwrap().is_empty());

            backend.insert(&kv("a", 1)).unwrap();
            backend.insert(&kv("b", 2)).unwrap();
            backend.update(&kv("a", 10)).unwrap();
            backend.delete("b").unwrap();
        }

        let mut backend: JournalBackend<Kv> =
            JournalBackend::open(dir.path(), JournalConfig::default()).unwrap();
        let records = backend.load_all().unwrap();
        assert_eq!(records, vec![kv("a", 10)]);
    }

    #[test]
    fn test_second_open_is_unavailable() {
        let dir = tempdir().unwrap();

        let _first: JournalBackend<Kv> =
            JournalBackend::open(dir.path(), JournalConfig::default()).unwrap();

        let err = JournalBackend::<Kv>::open(dir.path(), JournalConfig::default()).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[test]
    fn test_compaction_trigger_and_rewrite() {
        let dir = tempdir().unwrap();
        let config = JournalConfig {
            sync_on_write: false,
            max_journal_size: JournalConfig::MIN_JOURNAL_SIZE,
        };

        let mut backend: JournalBackend<Kv> = JournalBackend::open(dir.path(), config).unwrap();

        // Churn one key until the journal outgrows its budget
        backend.insert(&kv("a", 0)).unwrap();
        for v in 0..200 {
            backend.update(&kv("a", v)).unwrap();
        }
        assert!(backend.wants_compaction());

        backend.compact(&[kv("a", 199)]).unwrap();
        assert!(!backend.wants_compaction());

        let records = backend.load_all().unwrap();
        assert_eq!(records, vec![kv("a", 199)]);
    }

    #[test]
    fn test_replay_rejects_impossible_history() {
        let dir = tempdir().unwrap();

        let mut backend: JournalBackend<Kv> =
            JournalBackend::open(dir.path(), JournalConfig::default()).unwrap();

        // The store never journals a delete for an absent key; a journal
        // that holds one is corrupt.
        backend.delete("ghost").unwrap();
        let err = backend.load_all().unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }
}
