//! # Cardfile - A durable flat record store
//!
//! Cardfile is an embedded store for flat entity tables: records with one
//! designated string key and plain scalar fields. It provides uniform,
//! validated CRUD and substring search over one entity type per store,
//! backed by durable storage, hiding the storage medium from callers.
//!
//! ## Core Concepts
//!
//! - **Record**: a single entity instance with a unique key and scalar fields
//! - **EntityStore**: the in-memory mapping for one entity type, mirrored
//!   write-through to a storage backend
//! - **StorageBackend**: the persistence medium contract (journal file or
//!   in-memory)
//! - **Journal**: append-only, checksummed log replayed at startup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardfile::domain::library::{Book, Library};
//!
//! let mut library = Library::open("./library.cardfile")?;
//! library.add_book(Book::new("B-100", "Dune", "Frank Herbert", 5))?;
//! library.borrow("B-100")?;
//! assert_eq!(library.find("B-100").unwrap().quantity, 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod domain;
pub mod error;
pub mod record;
pub mod store;

// Re-export primary types at crate root for convenience
pub use error::{CardResult, CardfileError, DomainError, ValidationError};
pub use record::Record;
pub use store::{
    open_store, EntityStore, JournalBackend, JournalConfig, MemoryBackend, SearchMode,
    StorageBackend, StorageError, StoreOptions,
};
