//! # Repository Module
//!
//! Database repository implementations for Larder.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / coordinator                                            │
//! │       │                                                                 │
//! │       │  db.menu().load_recipe_book(&ids)                              │
//! │       ▼                                                                 │
//! │  MenuRepository / StoreItemRepository / SaleRepository                 │
//! │       │                                                                 │
//! │       │  SQL Query (pool, or the caller's unit of work)                │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads and catalog writes run on the pool. Sale rows are only ever written
//! through associated functions that take the commit's connection, so they
//! land in the same unit of work as the stock decrement.
//!
//! ## Available Repositories
//!
//! - [`MenuRepository`](menu::MenuRepository) - Menu items and recipes
//! - [`StoreItemRepository`](store_item::StoreItemRepository) - Stock catalog
//! - [`SaleRepository`](sale::SaleRepository) - Append-only sale history

pub mod menu;
pub mod sale;
pub mod store_item;

/// Column list shared by every `MenuItem` query.
pub(crate) const MENU_ITEM_COLUMNS: &str =
    "id, name, unit_price_cents, is_active, created_at, updated_at";

/// Column list shared by every `StoreItem` query.
pub(crate) const STORE_ITEM_COLUMNS: &str =
    "id, name, quantity_on_hand, cost_per_unit_cents, created_at, updated_at";
