//! # Validation: Request Field Checks
//!
//! Small, explicit validators for the fields that arrive from outside.
//! Callers validate at the edge and pass clean values down; nothing in
//! this crate re-checks what a validator already guaranteed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Search request          Sale request                                   │
//! │                                                                         │
//! │  shop_id ──┐             shop_id ──────► validate_shop_id              │
//! │            ├──► ok?      lines[] ──────► validate_sale_lines           │
//! │  query ────┘             each line ────► validate_sale_line            │
//! │                                                                         │
//! │  On error: typed ValidationError, never a stringly 400                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::SaleLine;

/// Result alias for validators.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a shop identifier.
///
/// ## Rules
/// - Required (non-empty after trimming)
/// - Must not contain `/`, since shop ids become document path segments
///
/// ## Returns
/// The trimmed id.
pub fn validate_shop_id(shop_id: &str) -> ValidationResult<String> {
    validate_doc_id(shop_id, "shop_id")
}

/// Validates any identifier that becomes a document path segment.
pub fn validate_doc_id(id: &str, field: &str) -> ValidationResult<String> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.contains('/') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "path separator '/' is not allowed".to_string(),
        });
    }

    Ok(id.to_string())
}

// =============================================================================
// Search Validators
// =============================================================================

/// Validates and normalizes a search query.
///
/// ## Rules
/// - Required (non-empty after trimming)
/// - Normalized to lowercase; scoring is case-insensitive anyway, but
///   normalizing once here keeps the echoed query stable
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_search_query;
///
/// assert_eq!(validate_search_query("  Rice ").unwrap(), "rice");
/// assert!(validate_search_query("   ").is_err());
/// ```
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.is_empty() {
        return Err(ValidationError::Required {
            field: "query".to_string(),
        });
    }

    Ok(query.to_lowercase())
}

// =============================================================================
// Sale Validators
// =============================================================================

/// Validates the line collection of a sale request.
///
/// ## Rules
/// - At least one line; an empty sale is rejected before any stock is
///   touched
pub fn validate_sale_lines(lines: &[SaleLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }
    Ok(())
}

/// Validates one sale line.
///
/// ## Rules
/// - `item_id`, `category_id` and `batch_id` are required
/// - `item_id` and `category_id` must be path-safe (they address the
///   item document to update)
/// - `quantity` must be positive
///
/// A failing line is reported and skipped by the sale processor; it
/// never aborts the lines around it.
pub fn validate_sale_line(line: &SaleLine) -> ValidationResult<()> {
    validate_doc_id(&line.item_id, "item_id")?;
    validate_doc_id(&line.category_id, "category_id")?;

    if line.batch_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "batch_id".to_string(),
        });
    }

    if line.quantity <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
