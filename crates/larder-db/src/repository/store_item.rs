//! # Store Item Repository
//!
//! Catalog operations for stock items. Quantity and cost changes on existing
//! rows go through [`StockLedger`](crate::commit::StockLedger) so they take
//! the same row locks as sale commits.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::STORE_ITEM_COLUMNS;
use larder_core::validation::{validate_item_name, validate_price_cents, validate_stock_quantity};
use larder_core::{Money, StoreItem, StoreItemId};

/// Repository for store item catalog operations.
#[derive(Debug, Clone)]
pub struct StoreItemRepository {
    pool: SqlitePool,
}

impl StoreItemRepository {
    /// Creates a new StoreItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreItemRepository { pool }
    }

    /// Inserts a new store item with its opening stock.
    ///
    /// ## Errors
    /// - `DbError::Invalid` for an empty name, negative stock or negative cost
    /// - `DbError::UniqueViolation` if the name is taken
    pub async fn insert(
        &self,
        name: &str,
        quantity_on_hand: i64,
        cost_per_unit: Money,
    ) -> DbResult<StoreItem> {
        validate_item_name(name)?;
        validate_stock_quantity("quantity_on_hand", quantity_on_hand, true)?;
        validate_price_cents("cost_per_unit", cost_per_unit.cents())?;

        debug!(
            name = %name,
            quantity_on_hand = quantity_on_hand,
            cost_per_unit = %cost_per_unit,
            "Inserting store item"
        );

        let item = sqlx::query_as::<_, StoreItem>(&format!(
            "INSERT INTO store_items \
             (name, quantity_on_hand, cost_per_unit_cents, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {STORE_ITEM_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(quantity_on_hand)
        .bind(cost_per_unit.cents())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a store item by ID.
    pub async fn get_by_id(&self, id: StoreItemId) -> DbResult<Option<StoreItem>> {
        let item = sqlx::query_as::<_, StoreItem>(&format!(
            "SELECT {STORE_ITEM_COLUMNS} FROM store_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists all store items by id.
    pub async fn list(&self) -> DbResult<Vec<StoreItem>> {
        let items = sqlx::query_as::<_, StoreItem>(&format!(
            "SELECT {STORE_ITEM_COLUMNS} FROM store_items ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists items at or below a reorder threshold, lowest stock first.
    pub async fn list_low_stock(&self, threshold: i64) -> DbResult<Vec<StoreItem>> {
        let items = sqlx::query_as::<_, StoreItem>(&format!(
            "SELECT {STORE_ITEM_COLUMNS} FROM store_items \
             WHERE quantity_on_hand <= ?1 ORDER BY quantity_on_hand, id"
        ))
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.store_items();

        let bun = repo.insert("Bun", 100, Money::from_cents(50)).await.unwrap();
        repo.insert("Patty", 5, Money::from_cents(150)).await.unwrap();

        assert_eq!(bun.quantity_on_hand, 100);
        assert_eq!(bun.cost_per_unit(), Money::from_cents(50));
        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.get_by_id(bun.id).await.unwrap().unwrap().name, "Bun");

        let low = repo.list_low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Patty");
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates_and_negative_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.store_items();

        repo.insert("Bun", 100, Money::from_cents(50)).await.unwrap();

        assert!(matches!(
            repo.insert("Bun", 1, Money::from_cents(50)).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(matches!(
            repo.insert("Cheese", -1, Money::from_cents(50)).await,
            Err(DbError::Invalid(_))
        ));
    }
}
