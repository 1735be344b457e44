//! The record contract.
//!
//! A record is one entity instance: a unique string key plus plain scalar
//! fields. Every store is generic over one record type, and everything the
//! store needs to know about that type is expressed here.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DomainError, ValidationError};

/// Contract for types stored in an [`EntityStore`](crate::store::EntityStore).
///
/// Implementors declare which field is the key, which text fields are
/// searchable, how to validate field values, and how to apply a field-level
/// partial update.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Field-level partial update for this record type.
    ///
    /// Patches carry only the fields being changed; the key is never part of
    /// a patch. The store re-validates the patched record under the same
    /// rules as insertion.
    type Patch;

    /// The unique key of this record. Must be non-empty.
    fn key(&self) -> &str;

    /// The searchable text fields of this record, including the key.
    fn search_text(&self) -> Vec<&str>;

    /// Validates field values: required text fields non-empty, numeric
    /// fields non-negative where the domain disallows negatives.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] encountered.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Applies a partial update to this record in place.
    fn apply(&mut self, patch: Self::Patch);
}

/// Checks that a required text field is non-empty (after trimming).
///
/// # Errors
/// Returns [`ValidationError::EmptyField`] if the value is blank.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

/// Checks that a numeric field is not negative.
///
/// # Errors
/// Returns [`ValidationError::NegativeValue`] if the value is below zero.
pub fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field, value });
    }
    Ok(())
}

/// Checks that an amount handed to a domain operation is strictly positive.
///
/// # Errors
/// Returns [`DomainError::NonPositiveAmount`] for zero or negative amounts.
pub fn require_positive(amount: f64) -> Result<(), DomainError> {
    if amount <= 0.0 {
        return Err(DomainError::NonPositiveAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("name", "Asha").is_ok());
        assert!(require_non_empty("name", "").is_err());
        assert!(require_non_empty("name", "   ").is_err());
    }

    #[test]
    fn test_require_non_negative() {
        assert!(require_non_negative("price", 0.0).is_ok());
        assert!(require_non_negative("price", 19.99).is_ok());

        let err = require_non_negative("price", -1.0).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NegativeValue { field: "price", .. }
        ));
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive(0.01).is_ok());
        assert!(require_positive(0.0).is_err());
        assert!(require_positive(-5.0).is_err());
    }
}
