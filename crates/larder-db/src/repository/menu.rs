//! # Menu Repository
//!
//! Database operations for menu items and their recipes.
//!
//! ## Key Operations
//! - Menu item CRUD with soft delete
//! - Recipe entry management
//! - Loading the `RecipeBook` a sale commit resolves against
//!
//! ## Soft Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete_menu_item(7)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE menu_items SET is_active = 0                                   │
//! │       │                                                                 │
//! │       ├── Old sale_details still reference item 7 (history intact)     │
//! │       └── New orders for item 7 fail with UnknownMenuItem              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::MENU_ITEM_COLUMNS;
use larder_core::validation::{validate_item_name, validate_price_cents, validate_quantity};
use larder_core::{MenuItem, MenuItemId, Money, RecipeBook, RecipeEntry, StoreItemId};

/// Repository for menu catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let menu = db.menu();
/// let burger = menu.insert("Burger", Money::from_cents(500)).await?;
/// menu.add_recipe_entry(burger.id, bun.id, 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    // =========================================================================
    // Menu Items
    // =========================================================================

    /// Inserts a new active menu item.
    ///
    /// ## Errors
    /// - `DbError::Invalid` for an empty name or negative price
    pub async fn insert(&self, name: &str, unit_price: Money) -> DbResult<MenuItem> {
        validate_item_name(name)?;
        validate_price_cents("unit_price", unit_price.cents())?;

        let now = Utc::now();
        debug!(name = %name, price = %unit_price, "Inserting menu item");

        let item = sqlx::query_as::<_, MenuItem>(&format!(
            "INSERT INTO menu_items (name, unit_price_cents, is_active, created_at, updated_at) \
             VALUES (?1, ?2, 1, ?3, ?3) RETURNING {MENU_ITEM_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(unit_price.cents())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a menu item by ID, active or not.
    pub async fn get_by_id(&self, id: MenuItemId) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists menu items ordered by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<MenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items \
             WHERE is_active = 1 OR ?1 \
             ORDER BY name, id"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Changes the price charged for future sales.
    ///
    /// Committed sale details keep the price they were sold at.
    pub async fn update_price(&self, id: MenuItemId, unit_price: Money) -> DbResult<MenuItem> {
        validate_price_cents("unit_price", unit_price.cents())?;

        debug!(id = id, price = %unit_price, "Updating menu item price");

        sqlx::query_as::<_, MenuItem>(&format!(
            "UPDATE menu_items SET unit_price_cents = ?2, updated_at = ?3 \
             WHERE id = ?1 RETURNING {MENU_ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(unit_price.cents())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("MenuItem", id))
    }

    /// Soft-deletes a menu item. It stays in sale history but can no longer
    /// be ordered.
    pub async fn soft_delete(&self, id: MenuItemId) -> DbResult<()> {
        debug!(id = id, "Soft-deleting menu item");

        let result = sqlx::query(
            "UPDATE menu_items SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        Ok(())
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Adds one ingredient to a menu item's recipe.
    ///
    /// ## Errors
    /// - `DbError::Invalid` if `quantity_per_unit` is not positive
    /// - `DbError::UniqueViolation` if the ingredient is already in the recipe
    /// - `DbError::ForeignKeyViolation` if either item does not exist
    pub async fn add_recipe_entry(
        &self,
        menu_item_id: MenuItemId,
        store_item_id: StoreItemId,
        quantity_per_unit: i64,
    ) -> DbResult<RecipeEntry> {
        validate_quantity(quantity_per_unit)?;

        debug!(
            menu_item_id = menu_item_id,
            store_item_id = store_item_id,
            quantity_per_unit = quantity_per_unit,
            "Adding recipe entry"
        );

        sqlx::query(
            "INSERT INTO recipe_entries (menu_item_id, store_item_id, quantity_per_unit) \
             VALUES (?1, ?2, ?3)",
        )
        .bind(menu_item_id)
        .bind(store_item_id)
        .bind(quantity_per_unit)
        .execute(&self.pool)
        .await?;

        Ok(RecipeEntry {
            menu_item_id,
            store_item_id,
            quantity_per_unit,
        })
    }

    /// Recipe entries of one menu item, by store item id.
    pub async fn recipe(&self, menu_item_id: MenuItemId) -> DbResult<Vec<RecipeEntry>> {
        let entries = sqlx::query_as::<_, RecipeEntry>(
            "SELECT menu_item_id, store_item_id, quantity_per_unit \
             FROM recipe_entries WHERE menu_item_id = ?1 ORDER BY store_item_id",
        )
        .bind(menu_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Loads every referenced menu item with its recipe.
    ///
    /// Ids with no row are simply absent from the book, so resolving an order
    /// against it reports them as unknown. Runs on one pooled connection that
    /// is released before this returns.
    pub async fn load_recipe_book(&self, ids: &[MenuItemId]) -> DbResult<RecipeBook> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut book = RecipeBook::new();
        if ids.is_empty() {
            return Ok(book);
        }

        let mut conn = self.pool.acquire().await?;

        let mut items_query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id IN ("));
        push_id_list(&mut items_query, &ids);
        let items: Vec<MenuItem> = items_query
            .build_query_as()
            .fetch_all(&mut *conn)
            .await?;

        let mut entries_query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT menu_item_id, store_item_id, quantity_per_unit \
             FROM recipe_entries WHERE menu_item_id IN (",
        );
        push_id_list(&mut entries_query, &ids);
        let entries: Vec<RecipeEntry> = entries_query
            .build_query_as()
            .fetch_all(&mut *conn)
            .await?;

        debug!(
            requested = ids.len(),
            found = items.len(),
            recipe_entries = entries.len(),
            "Loaded recipe book"
        );

        for item in items {
            let id = item.id;
            book.insert(item, entries.iter().copied().filter(|e| e.menu_item_id == id));
        }

        Ok(book)
    }
}

/// Appends `?, ?, ...)` for an `IN (` clause.
fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use larder_core::{CoreError, OrderLine};

    #[tokio::test]
    async fn test_insert_and_get_menu_item() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let menu = db.menu();

        let burger = menu.insert("  Burger ", Money::from_cents(500)).await.unwrap();
        assert_eq!(burger.name, "Burger");
        assert!(burger.is_active);

        let loaded = menu.get_by_id(burger.id).await.unwrap().unwrap();
        assert_eq!(loaded.unit_price(), Money::from_cents(500));
        assert!(menu.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(matches!(
            db.menu().insert("", Money::from_cents(100)).await,
            Err(DbError::Invalid(_))
        ));
        assert!(matches!(
            db.menu().insert("Soup", Money::from_cents(-1)).await,
            Err(DbError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_item_from_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let menu = db.menu();

        let soup = menu.insert("Soup", Money::from_cents(400)).await.unwrap();
        let salad = menu.insert("Salad", Money::from_cents(450)).await.unwrap();
        menu.soft_delete(soup.id).await.unwrap();

        assert_eq!(menu.list(false).await.unwrap().len(), 1);
        assert_eq!(menu.list(true).await.unwrap().len(), 2);

        let book = menu.load_recipe_book(&[soup.id, salad.id]).await.unwrap();
        let err = book.resolve(&[OrderLine::new(soup.id, 1)]).unwrap_err();
        assert_eq!(err, CoreError::UnknownMenuItem { menu_item_id: soup.id });

        assert!(matches!(
            menu.soft_delete(9999).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_recipe_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let menu = db.menu();

        let burger = menu.insert("Burger", Money::from_cents(500)).await.unwrap();
        let bun = db.store_items().insert("Bun", 100, Money::from_cents(50)).await.unwrap();
        let patty = db.store_items().insert("Patty", 50, Money::from_cents(150)).await.unwrap();

        menu.add_recipe_entry(burger.id, patty.id, 1).await.unwrap();
        menu.add_recipe_entry(burger.id, bun.id, 2).await.unwrap();

        let recipe = menu.recipe(burger.id).await.unwrap();
        assert_eq!(recipe.len(), 2);
        assert_eq!(recipe[0].store_item_id, bun.id);

        assert!(matches!(
            menu.add_recipe_entry(burger.id, bun.id, 3).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(matches!(
            menu.add_recipe_entry(burger.id, 9999, 1).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));
        assert!(matches!(
            menu.add_recipe_entry(burger.id, patty.id, 0).await,
            Err(DbError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_load_recipe_book_resolves_demand() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let menu = db.menu();

        let burger = menu.insert("Burger", Money::from_cents(500)).await.unwrap();
        let soda = menu.insert("Soda", Money::from_cents(200)).await.unwrap();
        let bun = db.store_items().insert("Bun", 100, Money::from_cents(50)).await.unwrap();
        menu.add_recipe_entry(burger.id, bun.id, 2).await.unwrap();

        let book = menu
            .load_recipe_book(&[soda.id, burger.id, burger.id])
            .await
            .unwrap();
        let demand = book
            .resolve(&[OrderLine::new(burger.id, 3), OrderLine::new(soda.id, 5)])
            .unwrap();

        assert_eq!(demand.required(bun.id), 6);
        assert_eq!(demand.len(), 1);
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let menu = db.menu();

        let burger = menu.insert("Burger", Money::from_cents(500)).await.unwrap();
        let updated = menu.update_price(burger.id, Money::from_cents(550)).await.unwrap();

        assert_eq!(updated.unit_price_cents, 550);
        assert!(matches!(
            menu.update_price(9999, Money::from_cents(1)).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
