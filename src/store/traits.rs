//! Abstract storage backend trait.
//!
//! The backend is the persistence medium behind an
//! [`EntityStore`](crate::store::EntityStore). The contract required of it is
//! deliberately small: durable key-addressed storage of one record type,
//! supporting full-scan read, single-record insert, update-by-key, and
//! delete-by-key. By using a trait we enable:
//! - In-memory backends for testing and ephemeral stores
//! - A journal-file backend for durable storage

use thiserror::Error;

use crate::record::Record;

/// Errors raised by storage backends and surfaced through the store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Key is absent where an existing record was required.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The medium could not be opened at load time.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Persisted data failed an integrity check.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Encoding or decoding a record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence medium for one entity type.
///
/// Mutations must be durable before they return `Ok`: the store treats a
/// successful backend call as the point of no return and only then updates
/// its in-memory mapping (write-through).
pub trait StorageBackend<R: Record> {
    /// Reads every persisted record. An empty or freshly created medium
    /// yields an empty list, not an error.
    ///
    /// # Errors
    /// [`StorageError::Unavailable`] if the medium cannot be opened or read;
    /// [`StorageError::Corruption`] if persisted data fails integrity checks.
    fn load_all(&mut self) -> Result<Vec<R>, StorageError>;

    /// Durably records a new record.
    ///
    /// # Errors
    /// Fails if the write cannot be completed; the caller must not consider
    /// the record stored.
    fn insert(&mut self, record: &R) -> Result<(), StorageError>;

    /// Durably records the new state of an existing record.
    ///
    /// # Errors
    /// Fails if the write cannot be completed.
    fn update(&mut self, record: &R) -> Result<(), StorageError>;

    /// Durably records the removal of a record.
    ///
    /// # Errors
    /// Fails if the write cannot be completed.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;

    /// Whether the backend would benefit from a compaction pass.
    fn wants_compaction(&self) -> bool {
        false
    }

    /// Rewrites the medium from the given live records.
    ///
    /// Called by the store after a mutation when [`wants_compaction`]
    /// reports true. The default implementation does nothing.
    ///
    /// # Errors
    /// Fails if the rewrite cannot be completed; the previous medium state
    /// must remain readable.
    ///
    /// [`wants_compaction`]: StorageBackend::wants_compaction
    fn compact(&mut self, records: &[R]) -> Result<(), StorageError> {
        let _ = records;
        Ok(())
    }
}
