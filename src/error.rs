//! Error types for cardfile.
//!
//! All errors are strongly typed using thiserror and returned as values to
//! the immediate caller. Nothing is retried automatically and no error is
//! used for control flow inside the store.

use thiserror::Error;

use crate::store::StorageError;

/// Validation errors raised while checking record fields.
///
/// A validation failure aborts an operation before any mutation: neither the
/// in-memory mapping nor the persisted medium is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The record key is empty or whitespace-only.
    #[error("Record key cannot be empty")]
    EmptyKey,

    /// A required text field is empty.
    #[error("Required field '{field}' cannot be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A numeric field is negative where the domain disallows negatives.
    #[error("Field '{field}' cannot be negative (got {value})")]
    NegativeValue {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A patch attempted to change the record key.
    #[error("Record key is immutable: '{from}' cannot become '{to}'")]
    KeyChanged {
        /// Key before the patch.
        from: String,
        /// Key the patch produced.
        to: String,
    },
}

/// Domain-specific precondition failures composed by callers on top of the
/// generic store (deposit/withdraw, borrow/return, restock/sell).
#[derive(Debug, Error)]
pub enum DomainError {
    /// A withdrawal or sale exceeds what is available.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount the caller asked for.
        requested: f64,
        /// Amount actually available.
        available: f64,
    },

    /// No copies/units left to borrow or sell.
    #[error("Out of stock: '{key}'")]
    OutOfStock {
        /// Key of the exhausted record.
        key: String,
    },

    /// A quantity or amount that must be positive was zero or negative.
    #[error("Amount must be positive (got {amount})")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: f64,
    },

    /// A stock adjustment would overflow the quantity counter.
    #[error("Quantity for '{key}' would overflow")]
    QuantityOverflow {
        /// Key of the record whose counter would overflow.
        key: String,
    },

    /// A return would push stock above the number of copies on loan.
    #[error("Cannot return '{key}': {on_loan} on loan")]
    ReturnExceedsLoans {
        /// Key of the record being returned.
        key: String,
        /// Copies currently on loan.
        on_loan: u32,
    },
}

/// Top-level error type for cardfile.
///
/// This enum encompasses all possible errors that can occur when using a
/// store or one of the domain modules built on it.
#[derive(Debug, Error)]
pub enum CardfileError {
    /// Input validation failed; nothing was mutated.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The storage layer rejected or failed the operation.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A domain precondition (funds, stock) was not met.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl CardfileError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a domain error.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// Returns true if the operation failed because the key already exists.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::Storage(StorageError::DuplicateKey(_)))
    }

    /// Returns true if the operation failed because the key was absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(StorageError::NotFound(_)))
    }
}

/// Result type alias for cardfile operations.
pub type CardResult<T> = Result<T, CardfileError>;
