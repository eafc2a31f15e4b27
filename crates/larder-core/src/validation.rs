//! # Validation Module
//!
//! Input validation for orders and catalog writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor                                               │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any resource is touched)                 │
//! │  ├── Order has lines                                                   │
//! │  └── Every quantity is positive                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity_on_hand >= 0)                                     │
//! │  ├── Foreign key constraints                                           │
//! │  └── Append-only triggers on sale tables                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::OrderLine;
use crate::MAX_ORDER_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Order Validators
// =============================================================================

/// Validates the shape of an order before any catalog or stock access.
///
/// ## Rules
/// - At least one line
/// - At most `MAX_ORDER_LINES` lines
/// - Every quantity positive
///
/// ## Example
/// ```rust
/// use larder_core::validation::validate_order_lines;
/// use larder_core::OrderLine;
///
/// assert!(validate_order_lines(&[OrderLine::new(1, 10)]).is_ok());
/// assert!(validate_order_lines(&[]).is_err());
/// assert!(validate_order_lines(&[OrderLine::new(1, 0)]).is_err());
/// ```
pub fn validate_order_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::LimitExceeded {
            field: "lines".to_string(),
            max: MAX_ORDER_LINES,
        });
    }

    for line in lines {
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

/// Validates an order line quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a menu or store item name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a price or cost in cents. Zero is allowed.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock quantity (on hand or restock delta).
pub fn validate_stock_quantity(field: &str, qty: i64, allow_zero: bool) -> ValidationResult<()> {
    if qty < 0 || (qty == 0 && !allow_zero) {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
