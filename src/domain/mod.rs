//! The demo applications as thin domain modules over [`EntityStore`].
//!
//! Each module defines one record type, its patch, and the quantity
//! operations the application needs. Quantity operations (deposit/withdraw,
//! borrow/return, sell/restock) are composed get + validate + update
//! sequences over the generic store; the store itself knows nothing about
//! them.
//!
//! Construct one wrapper per entity type at startup and hand it to the
//! presentation layer.
//!
//! [`EntityStore`]: crate::store::EntityStore

pub mod bank;
pub mod catalog;
pub mod library;
pub mod students;
