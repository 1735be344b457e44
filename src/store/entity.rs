//! The generic entity store.
//!
//! An [`EntityStore`] owns the in-memory mapping from key to record for one
//! entity type and mirrors every mutation write-through to its backend: a
//! mutation is not complete until the persisted copy reflects it, and a
//! backend failure leaves the mapping untouched.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{CardResult, ValidationError};
use crate::record::Record;
use crate::store::traits::{StorageBackend, StorageError};

/// Substring match policy, fixed per store instance at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// ASCII case-insensitive matching (the default).
    #[default]
    CaseInsensitive,
    /// Exact byte-for-byte matching.
    CaseSensitive,
}

impl SearchMode {
    fn matches(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::CaseSensitive => haystack.contains(needle),
            Self::CaseInsensitive => haystack
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

/// Per-store options.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Substring match policy for [`EntityStore::search`].
    pub search: SearchMode,
}

/// In-memory mapping for one entity type, mirrored write-through to a
/// storage backend.
///
/// Single-threaded, synchronous: each operation runs to completion before
/// the next begins, and mutating operations take `&mut self`. If multiple
/// processes can reach the same persisted medium, an external
/// mutual-exclusion discipline is required (the journal backend enforces one
/// with a directory lock).
#[derive(Debug)]
pub struct EntityStore<R: Record, B: StorageBackend<R>> {
    records: BTreeMap<String, R>,
    backend: B,
    options: StoreOptions,
}

impl<R: Record, B: StorageBackend<R>> EntityStore<R, B> {
    /// Opens a store by loading all persisted records from the backend.
    ///
    /// An empty or freshly created medium yields an empty store.
    ///
    /// # Errors
    /// - [`StorageError::Unavailable`] if the medium cannot be opened
    /// - [`StorageError::Corruption`] if the medium holds duplicate keys or
    ///   fails integrity checks
    pub fn open(mut backend: B, options: StoreOptions) -> CardResult<Self> {
        let loaded = backend.load_all()?;

        let mut records = BTreeMap::new();
        for record in loaded {
            let key = record.key().to_string();
            if records.insert(key.clone(), record).is_some() {
                return Err(StorageError::Corruption(format!(
                    "backend returned duplicate key '{key}' at load"
                ))
                .into());
            }
        }

        Ok(Self {
            records,
            backend,
            options,
        })
    }

    /// Inserts a new record, persisting it before the mapping is updated.
    ///
    /// # Errors
    /// - [`ValidationError`] if the key is empty or field validation fails
    /// - [`StorageError::DuplicateKey`] if the key already exists
    /// - any backend error, in which case the mapping is unchanged
    pub fn add(&mut self, record: R) -> CardResult<()> {
        if record.key().trim().is_empty() {
            return Err(ValidationError::EmptyKey.into());
        }
        record.validate()?;

        let key = record.key().to_string();
        if self.records.contains_key(&key) {
            return Err(StorageError::DuplicateKey(key).into());
        }

        self.backend.insert(&record)?;
        self.records.insert(key, record);
        self.maybe_compact();
        Ok(())
    }

    /// Returns a clone of the record if present. Absence is not an error.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<R> {
        self.records.get(key).cloned()
    }

    /// Returns true if a record with this key exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Applies a field-level partial update to an existing record.
    ///
    /// The patch is applied to a clone, the result re-validated under the
    /// same rules as [`add`](EntityStore::add), persisted, and only then
    /// swapped into the mapping.
    ///
    /// # Errors
    /// - [`StorageError::NotFound`] if the key is absent
    /// - [`ValidationError::KeyChanged`] if the patch altered the key
    /// - [`ValidationError`] if the patched record fails validation
    /// - any backend error, in which case the mapping is unchanged
    pub fn update(&mut self, key: &str, patch: R::Patch) -> CardResult<()> {
        let Some(existing) = self.records.get(key) else {
            return Err(StorageError::NotFound(key.to_string()).into());
        };

        let mut patched = existing.clone();
        patched.apply(patch);
        if patched.key() != key {
            return Err(ValidationError::KeyChanged {
                from: key.to_string(),
                to: patched.key().to_string(),
            }
            .into());
        }
        patched.validate()?;

        self.backend.update(&patched)?;
        self.records.insert(key.to_string(), patched);
        self.maybe_compact();
        Ok(())
    }

    /// Deletes the record from both persistence and the mapping.
    ///
    /// # Errors
    /// - [`StorageError::NotFound`] if the key is absent
    /// - any backend error, in which case the mapping is unchanged
    pub fn remove(&mut self, key: &str) -> CardResult<()> {
        if !self.records.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()).into());
        }

        self.backend.delete(key)?;
        self.records.remove(key);
        self.maybe_compact();
        Ok(())
    }

    /// Returns every record whose key or searchable text contains the given
    /// substring under the store's [`SearchMode`].
    ///
    /// An empty substring matches all records. Results are cloned snapshots
    /// in key order; later mutations do not affect an already-returned
    /// sequence.
    #[must_use]
    pub fn search(&self, substring: &str) -> Vec<R> {
        if substring.is_empty() {
            return self.list();
        }

        self.records
            .values()
            .filter(|record| {
                record
                    .search_text()
                    .iter()
                    .any(|field| self.options.search.matches(field, substring))
            })
            .cloned()
            .collect()
    }

    /// Returns a snapshot of all current records in key order.
    #[must_use]
    pub fn list(&self) -> Vec<R> {
        self.records.values().cloned().collect()
    }

    /// Number of records in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The substring match policy this store was constructed with.
    #[must_use]
    pub fn search_mode(&self) -> SearchMode {
        self.options.search
    }

    // The triggering mutation already succeeded durably, so a failed
    // compaction pass is reported but does not fail the operation.
    fn maybe_compact(&mut self) {
        if !self.backend.wants_compaction() {
            return;
        }
        let live: Vec<R> = self.records.values().cloned().collect();
        if let Err(e) = self.backend.compact(&live) {
            warn!(error = %e, "compaction failed; journal left as-is");
        }
    }
}
