//! # Error Types
//!
//! Domain-specific error types for larder-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  larder-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule failures (unknown item, shortfall) │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  larder-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── LedgerError      - Stock lock / availability failures             │
//! │  └── SaleCommitError  - What a sale commit caller sees                 │
//! │                                                                         │
//! │  larder-api errors (in app)                                            │
//! │  └── ApiError         - HTTP status + serialized body                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SaleCommitError → ApiError        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item IDs, quantities)
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::types::{MenuItemId, StoreItemId};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An order line references a menu item that is not in the catalog.
    ///
    /// ## When This Occurs
    /// - Menu item ID never existed
    /// - Menu item was retired (soft delete)
    #[error("Unknown menu item: {menu_item_id}")]
    UnknownMenuItem { menu_item_id: MenuItemId },

    /// Aggregate demand for a store item exceeds what is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Order: 26 × Burger (1 Patty each)
    ///      │
    ///      ▼
    /// Demand: Patty = 26, on hand = 20
    ///      │
    ///      ▼
    /// InsufficientStock { store_item_id: Patty, required: 26, available: 20 }
    ///      │
    ///      ▼
    /// Whole sale aborts (no partial fulfillment)
    /// ```
    #[error(
        "Insufficient stock for store item {store_item_id}: required {required}, available {available}"
    )]
    InsufficientStock {
        store_item_id: StoreItemId,
        required: i64,
        available: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur before any resource is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A collection holds more entries than a fixed limit allows.
    #[error("{field} exceeds the configured limit of {max} entries")]
    LimitExceeded { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Arithmetic on the value does not fit in 64 bits.
    #[error("{field} is too large")]
    Overflow { field: String },
}

impl ValidationError {
    /// Creates an Overflow error for a field.
    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
