//! # Cost Basis Recorder
//!
//! Appends one `sale_cost_logs` row per (sale detail, ingredient) inside the
//! commit's unit of work. The unit cost it records must be the one the
//! ledger read under the item's lock, never a fresh read.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use larder_core::{Money, SaleCostLog, SaleDetailId, StoreItemId};

/// Writes cost-of-goods rows for a sale being committed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostBasisRecorder;

impl CostBasisRecorder {
    pub fn new() -> Self {
        CostBasisRecorder
    }

    /// Records `quantity_used` units of a store item consumed by one sale
    /// detail at the snapshot unit cost.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        sale_detail_id: SaleDetailId,
        store_item_id: StoreItemId,
        quantity_used: i64,
        cost_per_unit: Money,
    ) -> DbResult<SaleCostLog> {
        debug!(
            sale_detail_id = sale_detail_id,
            store_item_id = store_item_id,
            quantity_used = quantity_used,
            cost_per_unit = %cost_per_unit,
            "Recording cost basis"
        );

        let log = sqlx::query_as::<_, SaleCostLog>(
            r#"
            INSERT INTO sale_cost_logs
                (sale_detail_id, store_item_id, quantity_used, cost_at_time_of_sale_cents)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, sale_detail_id, store_item_id, quantity_used, cost_at_time_of_sale_cents
            "#,
        )
        .bind(sale_detail_id)
        .bind(store_item_id)
        .bind(quantity_used)
        .bind(cost_per_unit.cents())
        .fetch_one(&mut *conn)
        .await?;

        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::sale::SaleRepository;
    use crate::unit_of_work::UnitOfWork;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use larder_core::OrderLine;

    async fn setup() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bun = db
            .store_items()
            .insert("Bun", 100, Money::from_cents(50))
            .await
            .unwrap();
        let burger = db.menu().insert("Burger", Money::from_cents(500)).await.unwrap();
        (db, burger.id, bun.id)
    }

    #[tokio::test]
    async fn test_record_appends_in_unit_of_work() {
        let (db, burger_id, bun_id) = setup().await;
        let recorder = CostBasisRecorder::new();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        let sale = SaleRepository::insert_sale(uow.conn(), Utc::now(), Money::from_cents(1000))
            .await
            .unwrap();
        let detail = SaleRepository::insert_detail(
            uow.conn(),
            sale.id,
            &OrderLine::new(burger_id, 2),
            Money::from_cents(500),
            Money::from_cents(1000),
        )
        .await
        .unwrap();
        let log = recorder
            .record(uow.conn(), detail.id, bun_id, 4, Money::from_cents(50))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(log.sale_detail_id, detail.id);
        assert_eq!(log.quantity_used, 4);
        assert_eq!(log.cost_at_time_of_sale_cents, 50);

        let logs = db.sales().cost_logs(sale.id).await.unwrap();
        assert_eq!(logs, vec![log]);
    }

    #[tokio::test]
    async fn test_record_discarded_on_rollback() {
        let (db, burger_id, bun_id) = setup().await;

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        let sale = SaleRepository::insert_sale(uow.conn(), Utc::now(), Money::from_cents(500))
            .await
            .unwrap();
        let detail = SaleRepository::insert_detail(
            uow.conn(),
            sale.id,
            &OrderLine::new(burger_id, 1),
            Money::from_cents(500),
            Money::from_cents(500),
        )
        .await
        .unwrap();
        CostBasisRecorder::new()
            .record(uow.conn(), detail.id, bun_id, 2, Money::from_cents(50))
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        assert!(db.sales().cost_logs(sale.id).await.unwrap().is_empty());
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_requires_existing_detail() {
        let (db, _, bun_id) = setup().await;

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        let result = CostBasisRecorder::new()
            .record(uow.conn(), 9999, bun_id, 1, Money::from_cents(50))
            .await;
        uow.rollback().await.unwrap();

        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }
}
