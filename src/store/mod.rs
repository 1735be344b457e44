//! Storage layer: the generic entity store and its backends.

mod entity;
pub mod journal;
mod memory;
mod traits;

pub use entity::{EntityStore, SearchMode, StoreOptions};
pub use journal::{open_store, JournalBackend, JournalConfig};
pub use memory::MemoryBackend;
pub use traits::{StorageBackend, StorageError};
