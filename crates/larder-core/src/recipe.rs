//! # Recipe Resolution
//!
//! Expands ordered menu-item quantities into aggregate raw-ingredient demand.
//!
//! ## How Demand Is Built
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order                         Recipes                                 │
//! │  ─────                         ───────                                 │
//! │  10 × Burger        ──►  Burger: 2 × Bun, 1 × Patty                    │
//! │   3 × Cheeseburger  ──►  Cheeseburger: 2 × Bun, 1 × Patty, 1 × Cheese  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  IngredientDemand (ascending store item id)                            │
//! │    Bun    = 10×2 + 3×2 = 26                                             │
//! │    Patty  = 10×1 + 3×1 = 13                                             │
//! │    Cheese =        3×1 =  3                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution is pure and order-independent: the same multiset of lines
//! always yields the same demand, and the demand is always iterated in
//! ascending store item id. The stock ledger relies on that ordering when it
//! acquires row locks.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MenuItem, MenuItemId, OrderLine, RecipeEntry, StoreItemId};

// =============================================================================
// Ingredient Demand
// =============================================================================

/// Aggregate quantity required per store item for a whole order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientDemand(BTreeMap<StoreItemId, i64>);

impl IngredientDemand {
    /// Creates an empty demand map.
    pub fn new() -> Self {
        IngredientDemand(BTreeMap::new())
    }

    /// Adds `quantity` to the demand for `store_item_id`.
    pub fn add(&mut self, store_item_id: StoreItemId, quantity: i64) -> CoreResult<()> {
        let slot = self.0.entry(store_item_id).or_insert(0);
        *slot = slot
            .checked_add(quantity)
            .ok_or_else(|| ValidationError::overflow("ingredient demand"))?;
        Ok(())
    }

    /// Quantity required for one store item (zero if not demanded).
    pub fn required(&self, store_item_id: StoreItemId) -> i64 {
        self.0.get(&store_item_id).copied().unwrap_or(0)
    }

    /// Iterates `(store_item_id, required)` in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (StoreItemId, i64)> + '_ {
        self.0.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Store item ids in ascending order.
    pub fn store_item_ids(&self) -> Vec<StoreItemId> {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first (lowest id) store item whose demand exceeds what is
    /// available, as an `InsufficientStock` error.
    ///
    /// Items missing from `on_hand` count as zero available.
    pub fn check_available(&self, on_hand: &BTreeMap<StoreItemId, i64>) -> CoreResult<()> {
        for (store_item_id, required) in self.iter() {
            let available = on_hand.get(&store_item_id).copied().unwrap_or(0);
            if available < required {
                return Err(CoreError::InsufficientStock {
                    store_item_id,
                    required,
                    available,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(StoreItemId, i64)> for IngredientDemand {
    fn from_iter<I: IntoIterator<Item = (StoreItemId, i64)>>(iter: I) -> Self {
        IngredientDemand(iter.into_iter().collect())
    }
}

// =============================================================================
// Recipe Book
// =============================================================================

/// Snapshot of the catalog entries one order needs: each referenced menu
/// item with its recipe.
///
/// Built by the catalog repository, then used read-only for the rest of the
/// commit.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    items: HashMap<MenuItemId, MenuItem>,
    recipes: HashMap<MenuItemId, Vec<RecipeEntry>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        RecipeBook::default()
    }

    /// Registers a menu item and its recipe entries.
    ///
    /// Entries belonging to other menu items are ignored.
    pub fn insert(&mut self, item: MenuItem, entries: impl IntoIterator<Item = RecipeEntry>) {
        let id = item.id;
        let entries: Vec<RecipeEntry> = entries
            .into_iter()
            .filter(|entry| entry.menu_item_id == id)
            .collect();
        self.items.insert(id, item);
        self.recipes.insert(id, entries);
    }

    /// Looks up a menu item. Inactive items are treated as unknown.
    pub fn menu_item(&self, menu_item_id: MenuItemId) -> CoreResult<&MenuItem> {
        self.items
            .get(&menu_item_id)
            .filter(|item| item.is_active)
            .ok_or(CoreError::UnknownMenuItem { menu_item_id })
    }

    /// Recipe entries for a menu item. Empty for items that consume no stock.
    pub fn recipe(&self, menu_item_id: MenuItemId) -> CoreResult<&[RecipeEntry]> {
        self.menu_item(menu_item_id)?;
        Ok(self
            .recipes
            .get(&menu_item_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// Expands order lines into aggregate ingredient demand.
    ///
    /// ## Errors
    /// - `UnknownMenuItem` if any line references a menu item not in the book
    /// - `Validation(Overflow)` if a quantity product or sum overflows
    pub fn resolve(&self, lines: &[OrderLine]) -> CoreResult<IngredientDemand> {
        let mut demand = IngredientDemand::new();

        for line in lines {
            for entry in self.recipe(line.menu_item_id)? {
                demand.add(entry.store_item_id, consumed_by(entry, line)?)?;
            }
        }

        Ok(demand)
    }
}

/// Quantity of `entry`'s store item consumed by one order line.
pub fn consumed_by(entry: &RecipeEntry, line: &OrderLine) -> CoreResult<i64> {
    entry
        .quantity_per_unit
        .checked_mul(line.quantity)
        .ok_or_else(|| ValidationError::overflow("ingredient demand").into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const BURGER: MenuItemId = 1;
    const CHEESEBURGER: MenuItemId = 2;
    const SODA: MenuItemId = 3;
    const RETIRED: MenuItemId = 4;

    const BUN: StoreItemId = 10;
    const PATTY: StoreItemId = 11;
    const CHEESE: StoreItemId = 12;

    fn menu_item(id: MenuItemId, price: i64, active: bool) -> MenuItem {
        let now = Utc::now();
        MenuItem {
            id,
            name: format!("item-{id}"),
            unit_price_cents: price,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(menu_item_id: MenuItemId, store_item_id: StoreItemId, qty: i64) -> RecipeEntry {
        RecipeEntry {
            menu_item_id,
            store_item_id,
            quantity_per_unit: qty,
        }
    }

    fn book() -> RecipeBook {
        let mut book = RecipeBook::new();
        book.insert(
            menu_item(BURGER, 500, true),
            [entry(BURGER, BUN, 2), entry(BURGER, PATTY, 1)],
        );
        book.insert(
            menu_item(CHEESEBURGER, 650, true),
            [
                entry(CHEESEBURGER, BUN, 2),
                entry(CHEESEBURGER, PATTY, 1),
                entry(CHEESEBURGER, CHEESE, 1),
            ],
        );
        book.insert(menu_item(SODA, 200, true), []);
        book.insert(menu_item(RETIRED, 900, false), [entry(RETIRED, PATTY, 3)]);
        book
    }

    #[test]
    fn test_resolve_single_line() {
        let demand = book().resolve(&[OrderLine::new(BURGER, 10)]).unwrap();

        assert_eq!(demand.required(BUN), 20);
        assert_eq!(demand.required(PATTY), 10);
        assert_eq!(demand.len(), 2);
    }

    #[test]
    fn test_shared_ingredients_aggregate() {
        let demand = book()
            .resolve(&[
                OrderLine::new(BURGER, 10),
                OrderLine::new(CHEESEBURGER, 3),
                OrderLine::new(BURGER, 1),
            ])
            .unwrap();

        assert_eq!(demand.required(BUN), 28);
        assert_eq!(demand.required(PATTY), 14);
        assert_eq!(demand.required(CHEESE), 3);
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let book = book();
        let a = book
            .resolve(&[OrderLine::new(CHEESEBURGER, 2), OrderLine::new(BURGER, 5)])
            .unwrap();
        let b = book
            .resolve(&[OrderLine::new(BURGER, 5), OrderLine::new(CHEESEBURGER, 2)])
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.store_item_ids(), vec![BUN, PATTY, CHEESE]);
    }

    #[test]
    fn test_item_without_recipe_has_no_demand() {
        let demand = book().resolve(&[OrderLine::new(SODA, 4)]).unwrap();
        assert!(demand.is_empty());
    }

    #[test]
    fn test_unknown_and_retired_items_fail() {
        let book = book();

        let err = book.resolve(&[OrderLine::new(99, 1)]).unwrap_err();
        assert_eq!(err, CoreError::UnknownMenuItem { menu_item_id: 99 });

        let err = book
            .resolve(&[OrderLine::new(BURGER, 1), OrderLine::new(RETIRED, 1)])
            .unwrap_err();
        assert_eq!(err, CoreError::UnknownMenuItem { menu_item_id: RETIRED });
    }

    #[test]
    fn test_overflow_is_validation_error() {
        let err = book()
            .resolve(&[OrderLine::new(BURGER, i64::MAX)])
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));
    }

    #[test]
    fn test_check_available_names_lowest_failing_item() {
        let demand: IngredientDemand = [(BUN, 30), (PATTY, 30), (CHEESE, 5)].into_iter().collect();
        let on_hand: BTreeMap<StoreItemId, i64> =
            [(BUN, 100), (PATTY, 20), (CHEESE, 1)].into_iter().collect();

        let err = demand.check_available(&on_hand).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                store_item_id: PATTY,
                required: 30,
                available: 20,
            }
        );
    }

    #[test]
    fn test_check_available_exact_quantity_passes() {
        let demand: IngredientDemand = [(PATTY, 20)].into_iter().collect();
        let on_hand: BTreeMap<StoreItemId, i64> = [(PATTY, 20)].into_iter().collect();
        assert!(demand.check_available(&on_hand).is_ok());
    }
}
