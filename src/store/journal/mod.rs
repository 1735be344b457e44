//! Durable journal-file storage.
//!
//! This module provides the crate's durable medium:
//! - Append-only journal with CRC32-checksummed entries
//! - Torn-tail repair on open, full replay at load
//! - Exclusive directory lock for single-process access
//! - Size-triggered compaction (rewrite from live records)
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               JournalBackend                  │
//! ├───────────────────────────────────────────────┤
//! │  ┌───────────────┐      ┌──────────────────┐  │
//! │  │    Journal    │      │     DirLock      │  │
//! │  │ (append-only) │      │ (flock/.lock)    │  │
//! │  └───────┬───────┘      └──────────────────┘  │
//! │          │ framed entries                     │
//! │  ┌───────▼───────┐                            │
//! │  │     codec     │  [ver][len][JSON][crc32]   │
//! │  └───────────────┘                            │
//! └───────────────────────────────────────────────┘
//! ```

mod backend;
mod codec;
mod file_lock;
mod log;

pub use backend::JournalBackend;
pub use file_lock::DirLock;
pub use log::{Journal, JournalEntry, JournalIter, JournalOp};

use std::path::Path;

use crate::error::CardResult;
use crate::record::Record;
use crate::store::entity::{EntityStore, StoreOptions};
use crate::store::traits::StorageError;

/// Configuration for the journal backend.
#[derive(Debug, Clone, Copy)]
pub struct JournalConfig {
    /// Whether to fsync after every append (slower but safest).
    pub sync_on_write: bool,
    /// Journal size (bytes) above which a compaction pass is requested.
    pub max_journal_size: u64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            max_journal_size: 8 * 1024 * 1024, // 8 MB
        }
    }
}

impl JournalConfig {
    /// Minimum journal size budget, to avoid degenerate compaction loops.
    pub const MIN_JOURNAL_SIZE: u64 = 4 * 1024;

    /// Validates configuration bounds.
    ///
    /// # Errors
    /// [`StorageError::Backend`] if `max_journal_size` is below
    /// [`MIN_JOURNAL_SIZE`](JournalConfig::MIN_JOURNAL_SIZE).
    pub fn validate(self) -> Result<Self, StorageError> {
        if self.max_journal_size < Self::MIN_JOURNAL_SIZE {
            return Err(StorageError::Backend(format!(
                "max_journal_size must be at least {} bytes (got {})",
                Self::MIN_JOURNAL_SIZE,
                self.max_journal_size
            )));
        }
        Ok(self)
    }
}

/// Opens or creates a durable store at the given directory.
///
/// Convenience wrapper: journal backend with the given (or default) config,
/// loaded into an [`EntityStore`].
///
/// # Errors
/// - [`StorageError::Unavailable`] if the directory cannot be created or is
///   locked by another process
/// - [`StorageError::Corruption`] if journal replay fails
///
/// # Example
/// ```rust,ignore
/// use std::path::Path;
/// use cardfile::{open_store, StoreOptions};
/// use cardfile::domain::library::Book;
///
/// let store = open_store::<Book>(Path::new("./books.cardfile"), None, StoreOptions::default())?;
/// ```
pub fn open_store<R: Record>(
    dir: &Path,
    config: Option<JournalConfig>,
    options: StoreOptions,
) -> CardResult<EntityStore<R, JournalBackend<R>>> {
    let backend = JournalBackend::open(dir, config.unwrap_or_default())?;
    EntityStore::open(backend, options)
}
