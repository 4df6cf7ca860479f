//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  duka-core errors (this file)                                          │
//! │  ├── CoreError        - Domain errors with item/batch context          │
//! │  ├── AllocationError  - Pure allocation failures (no context)          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  duka-store errors (separate crate)                                    │
//! │  └── StoreError       - Document store failures                        │
//! │                                                                         │
//! │  duka-engine errors (separate crate)                                   │
//! │  └── EngineError      - Service-level failures                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → transport DTO       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, batch id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Sale-line errors never abort the sale; they are collected per line

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These carry enough context (item names, batch ids, quantities) to be
/// rendered directly into per-line sale errors or search failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Shop id is absent from the catalog snapshot.
    #[error("Shop not found: {0}")]
    ShopNotFound(String),

    /// Item cannot be found in the store.
    #[error("Item {0} not found in database")]
    ItemNotFound(String),

    /// The named batch does not exist on the item.
    ///
    /// ## When This Occurs
    /// - The cart was built against a stale snapshot and the batch was
    ///   deleted or renamed before the sale arrived
    #[error("Batch {batch_id} not found for {item_name}")]
    BatchNotFound {
        batch_id: String,
        item_name: String,
    },

    /// Batch cannot cover the requested base quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart line: 9 base units from batch "January"
    ///      │
    ///      ▼
    /// Authoritative read: batch has 8.0 remaining
    ///      │
    ///      ▼
    /// InsufficientStock { requested: 9.0, available: 8.0, shortfall: 1.0 }
    ///      │
    ///      ▼
    /// Line error recorded, rest of the cart still commits
    /// ```
    #[error("Insufficient stock for {item_name}: need {requested}, have {available}")]
    InsufficientStock {
        item_name: String,
        requested: f64,
        available: f64,
        shortfall: f64,
    },

    /// Allocation error (wraps AllocationError).
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Allocation Error
// =============================================================================

/// Failures from the pure FIFO allocation functions.
///
/// Context-free on purpose: callers attach item/line context when they
/// lift these into `CoreError` or per-line sale errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    /// The item has no batches to draw from.
    #[error("No batches available")]
    NoBatches,

    /// The selling unit has no batch links to draw from.
    #[error("No batch links available")]
    NoBatchLinks,

    /// Batches ran dry before the request was met.
    ///
    /// `satisfied` is how much the batches could cover; `shortfall` is the
    /// remainder (`requested - satisfied`).
    #[error("Insufficient stock: requested {requested}, available {satisfied} (short {shortfall})")]
    InsufficientStock {
        requested: f64,
        satisfied: f64,
        shortfall: f64,
    },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-finite number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection is empty where at least one element is required.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item_name: "Rice 2kg".to_string(),
            requested: 9.0,
            available: 8.0,
            shortfall: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rice 2kg: need 9, have 8"
        );
    }

    #[test]
    fn test_allocation_error_messages() {
        let err = AllocationError::InsufficientStock {
            requested: 12.0,
            satisfied: 10.0,
            shortfall: 2.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock: requested 12, available 10 (short 2)"
        );
        assert_eq!(AllocationError::NoBatches.to_string(), "No batches available");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "shop_id".to_string(),
        };
        assert_eq!(err.to_string(), "shop_id is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_allocation_converts_to_core_error() {
        let core_err: CoreError = AllocationError::NoBatches.into();
        assert!(matches!(core_err, CoreError::Allocation(_)));
    }
}
