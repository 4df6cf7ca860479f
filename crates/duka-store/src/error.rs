//! # Store Error Types
//!
//! Two families: [`StoreError`] for operations against a backend, and
//! [`DocValidationError`] for documents that fail the read boundary and
//! get quarantined by the cache builder.

use thiserror::Error;

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document addressed by a write was not there.
    #[error("{what} not found at {path}")]
    NotFound { what: &'static str, path: String },

    /// The atomic commit could not be applied; no document was changed.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// A stored document could not be decoded at all.
    #[error("Corrupt document at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl StoreError {
    /// Shorthand used by backends when a write targets a missing document.
    pub fn not_found(what: &'static str, path: impl Into<String>) -> Self {
        StoreError::NotFound {
            what,
            path: path.into(),
        }
    }
}

// =============================================================================
// Document Validation Errors
// =============================================================================

/// Why a stored document failed validation into core catalog types.
///
/// These do not abort a cache rebuild; the offending document is
/// skipped, logged and counted as quarantined.
#[derive(Debug, Error, PartialEq)]
pub enum DocValidationError {
    #[error("name is empty")]
    EmptyName,

    #[error("batch at index {index} has no id")]
    BatchMissingId { index: usize },

    #[error("batch {batch_id} has an invalid quantity")]
    InvalidQuantity { batch_id: String },

    #[error("batch {batch_id} has an invalid price")]
    InvalidPrice { batch_id: String },

    #[error("conversion factor is not a finite number")]
    InvalidConversionFactor,

    #[error("batch link {batch_id} has invalid unit counts")]
    InvalidLink { batch_id: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_document() {
        let err = StoreError::not_found("item", "Shops/s1/categories/c1/items/i9");
        assert_eq!(
            err.to_string(),
            "item not found at Shops/s1/categories/c1/items/i9"
        );
    }

    #[test]
    fn validation_errors_render_context() {
        let err = DocValidationError::InvalidQuantity {
            batch_id: "b1".to_string(),
        };
        assert_eq!(err.to_string(), "batch b1 has an invalid quantity");
    }
}
