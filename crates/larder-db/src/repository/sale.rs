//! # Sale Repository
//!
//! Database operations for committed sales, their details and cost logs.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. WRITE (inside the sale commit unit of work only)                   │
//! │     └── insert_sale()   → Sale { sale_date, total }                    │
//! │     └── insert_detail() → SaleDetail (unit price snapshot)             │
//! │     └── CostBasisRecorder::record() → SaleCostLog                      │
//! │                                                                         │
//! │  2. READ (any time, from the pool)                                     │
//! │     └── get_committed() / list() / cost_of_goods()                     │
//! │                                                                         │
//! │  There is no update or delete: triggers reject both.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use larder_core::{
    CommittedSale, Money, OrderLine, Sale, SaleCostLog, SaleDetail, SaleId, SalePage,
};

const SALE_COLUMNS: &str = "id, sale_date, total_cents";
const SALE_DETAIL_COLUMNS: &str =
    "id, sale_id, menu_item_id, quantity, unit_price_cents, subtotal_cents";

/// Repository for sale history.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Writes (caller's unit of work)
    // =========================================================================

    /// Inserts the sale header.
    pub(crate) async fn insert_sale(
        conn: &mut SqliteConnection,
        sale_date: DateTime<Utc>,
        total: Money,
    ) -> DbResult<Sale> {
        debug!(total = %total, "Inserting sale");

        let sale = sqlx::query_as::<_, Sale>(&format!(
            "INSERT INTO sales (sale_date, total_cents) VALUES (?1, ?2) RETURNING {SALE_COLUMNS}"
        ))
        .bind(sale_date)
        .bind(total.cents())
        .fetch_one(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Inserts one sale detail.
    ///
    /// ## Snapshot Pattern
    /// The menu item's price is copied onto the detail, so later price
    /// changes never rewrite sale history.
    pub(crate) async fn insert_detail(
        conn: &mut SqliteConnection,
        sale_id: SaleId,
        line: &OrderLine,
        unit_price: Money,
        subtotal: Money,
    ) -> DbResult<SaleDetail> {
        debug!(
            sale_id = sale_id,
            menu_item_id = line.menu_item_id,
            quantity = line.quantity,
            "Inserting sale detail"
        );

        let detail = sqlx::query_as::<_, SaleDetail>(&format!(
            "INSERT INTO sale_details \
             (sale_id, menu_item_id, quantity, unit_price_cents, subtotal_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {SALE_DETAIL_COLUMNS}"
        ))
        .bind(sale_id)
        .bind(line.menu_item_id)
        .bind(line.quantity)
        .bind(unit_price.cents())
        .bind(subtotal.cents())
        .fetch_one(&mut *conn)
        .await?;

        Ok(detail)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: SaleId) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Details of one sale, in insertion (order line) order.
    pub async fn details(&self, sale_id: SaleId) -> DbResult<Vec<SaleDetail>> {
        let details = sqlx::query_as::<_, SaleDetail>(&format!(
            "SELECT {SALE_DETAIL_COLUMNS} FROM sale_details WHERE sale_id = ?1 ORDER BY id"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(details)
    }

    /// Cost logs of every detail of one sale.
    pub async fn cost_logs(&self, sale_id: SaleId) -> DbResult<Vec<SaleCostLog>> {
        let logs = sqlx::query_as::<_, SaleCostLog>(
            r#"
            SELECT
                l.id,
                l.sale_detail_id,
                l.store_item_id,
                l.quantity_used,
                l.cost_at_time_of_sale_cents
            FROM sale_cost_logs l
            INNER JOIN sale_details d ON d.id = l.sale_detail_id
            WHERE d.sale_id = ?1
            ORDER BY l.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    /// Loads a sale with its details and cost logs.
    pub async fn get_committed(&self, id: SaleId) -> DbResult<Option<CommittedSale>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let details = self.details(id).await?;
        let cost_logs = self.cost_logs(id).await?;

        Ok(Some(CommittedSale {
            sale,
            details,
            cost_logs,
        }))
    }

    /// Cost of goods sold for one sale: sum of quantity used × frozen unit cost.
    ///
    /// ## Errors
    /// `DbError::Invalid(Overflow)` if the total does not fit in 64 bits.
    pub async fn cost_of_goods(&self, sale_id: SaleId) -> DbResult<Money> {
        let logs = self.cost_logs(sale_id).await?;
        Ok(larder_core::cost_of_goods(&logs)?)
    }

    /// Counts committed sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// One page of sales, newest first. `page` is 1-based; values below 1
    /// are treated as 1.
    pub async fn list(&self, page: i64, per_page: i64) -> DbResult<SalePage> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page - 1).saturating_mul(per_page);

        debug!(page = page, per_page = per_page, "Listing sales");

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY id DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = self.count().await?;

        Ok(SalePage {
            sales,
            total,
            page,
            per_page,
        })
    }
}
