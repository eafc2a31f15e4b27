//! # Domain Types
//!
//! Core domain types for the sale commit path.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    MenuItem     │   │   RecipeEntry   │   │    StoreItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  menu_item_id   │   │  id             │       │
//! │  │  name           │   │  store_item_id  │──►│  name           │       │
//! │  │  unit_price     │   │  qty_per_unit   │   │  qty_on_hand    │       │
//! │  └─────────────────┘   └─────────────────┘   │  cost_per_unit  │       │
//! │                                              └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │   SaleDetail    │   │   SaleCostLog   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  sale_id        │◄──│  sale_detail_id │       │
//! │  │  sale_date      │   │  menu_item_id   │   │  store_item_id  │       │
//! │  │  total_amount   │   │  quantity       │   │  quantity_used  │       │
//! │  └─────────────────┘   │  subtotal       │   │  cost snapshot  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Associations are plain foreign-key fields. Nothing here loads related
//! rows implicitly; repositories do explicit lookups.
//!
//! Quantities are integer counts of the store item's base unit (pieces,
//! grams, millilitres). Money fields are stored as cents with a `Money`
//! accessor beside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Identifiers
// =============================================================================

pub type MenuItemId = i64;
pub type StoreItemId = i64;
pub type SaleId = i64;
pub type SaleDetailId = i64;

// =============================================================================
// Catalog
// =============================================================================

/// A dish or drink on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    /// Price in cents charged per unit ordered.
    pub unit_price_cents: i64,
    /// Retired menu items stay for sale history but can't be ordered.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// A consumable stock item (ingredient, packaging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoreItem {
    pub id: StoreItemId,
    pub name: String,
    /// Never negative after a committed transaction.
    pub quantity_on_hand: i64,
    /// Cost in cents per base unit.
    pub cost_per_unit_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StoreItem {
    /// Returns the cost per unit as Money.
    #[inline]
    pub fn cost_per_unit(&self) -> Money {
        Money::from_cents(self.cost_per_unit_cents)
    }
}

/// How much of one store item a single unit of a menu item consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecipeEntry {
    pub menu_item_id: MenuItemId,
    pub store_item_id: StoreItemId,
    pub quantity_per_unit: i64,
}

// =============================================================================
// Orders
// =============================================================================

/// One line of an incoming order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(menu_item_id: MenuItemId, quantity: i64) -> Self {
        OrderLine {
            menu_item_id,
            quantity,
        }
    }
}

// =============================================================================
// Sale Records (append-only)
// =============================================================================

/// A committed sale. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: SaleId,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    /// Equals the sum of the detail subtotals.
    pub total_cents: i64,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// One order line of a committed sale.
///
/// Uses the snapshot pattern: the unit price is frozen at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleDetail {
    pub id: SaleDetailId,
    pub sale_id: SaleId,
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
}

impl SaleDetail {
    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Cost basis of one ingredient consumed by one sale detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleCostLog {
    pub id: i64,
    pub sale_detail_id: SaleDetailId,
    pub store_item_id: StoreItemId,
    pub quantity_used: i64,
    /// Per-unit cost in cents read under the stock lock (frozen).
    pub cost_at_time_of_sale_cents: i64,
}

impl SaleCostLog {
    /// Returns the per-unit cost snapshot as Money.
    #[inline]
    pub fn cost_at_time_of_sale(&self) -> Money {
        Money::from_cents(self.cost_at_time_of_sale_cents)
    }

    /// Returns quantity_used × cost snapshot, or `None` on overflow.
    #[inline]
    pub fn line_cost(&self) -> Option<Money> {
        self.cost_at_time_of_sale()
            .checked_multiply_quantity(self.quantity_used)
    }
}

/// A sale together with everything written in its unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommittedSale {
    pub sale: Sale,
    pub details: Vec<SaleDetail>,
    pub cost_logs: Vec<SaleCostLog>,
}

impl CommittedSale {
    /// Total cost of goods sold for this sale.
    ///
    /// ## Errors
    /// `ValidationError::Overflow` if a line cost or the sum does not fit.
    pub fn cost_of_goods(&self) -> Result<Money, ValidationError> {
        cost_of_goods(&self.cost_logs)
    }
}

/// Sums `quantity_used × cost` over cost logs with overflow checks.
pub fn cost_of_goods(logs: &[SaleCostLog]) -> Result<Money, ValidationError> {
    logs.iter().try_fold(Money::zero(), |acc, log| {
        log.line_cost()
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| ValidationError::overflow("cost_of_goods"))
    })
}

/// One page of committed sales, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePage {
    pub sales: Vec<Sale>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
