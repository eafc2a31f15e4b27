//! # larder-core: Pure Business Logic for Larder
//!
//! This crate holds the domain model and the pure half of the sale commit
//! path. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Larder Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (larder-api)                        │   │
//! │  │         POST /sales, GET /sales, GET /sales/{id}               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    larder-db (Database Layer)                   │   │
//! │  │   SaleCommitCoordinator ─► StockLedger ─► CostBasisRecorder     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ larder-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  recipe   │  │ validation│  │   │
//! │  │   │ MenuItem  │  │   Money   │  │RecipeBook │  │   rules   │  │   │
//! │  │   │ StoreItem │  │           │  │  Demand   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MenuItem, StoreItem, Sale, SaleCostLog, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`recipe`] - Recipe expansion into aggregate ingredient demand
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use larder_core::money::Money;
//!
//! let burger = Money::from_cents(500); // $5.00
//! let subtotal = burger.checked_multiply_quantity(10).unwrap();
//!
//! assert_eq!(subtotal.cents(), 5000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod recipe;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use recipe::{IngredientDemand, RecipeBook};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted in a single order.
///
/// ## Business Reason
/// A ticket with hundreds of lines is a client bug, not a lunch rush.
/// Longer orders fail with `ValidationError::LimitExceeded`.
pub const MAX_ORDER_LINES: usize = 200;
