//! # Stock Ledger
//!
//! Checks and decrements stock for an order's ingredient demand under
//! per-item locks, and hands back a [`ReservationToken`] that keeps those
//! locks and the open transaction until the caller commits or aborts.
//!
//! ## Reservation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_and_reserve(demand)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. RowLocks::acquire(ids ascending, deadline) ── timeout ──► LockTimeout
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. UnitOfWork::begin (BEGIN IMMEDIATE)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Read quantity + cost per item (the snapshot)                       │
//! │       │                                                                 │
//! │       ├── any item short ──► ROLLBACK, unlock ──► InsufficientStock    │
//! │       ▼                       (lowest failing id)                      │
//! │  4. Decrement every item                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReservationToken { locks, unit of work, snapshots }                   │
//! │       │                                                                 │
//! │       ├── commit() ── COMMIT, then unlock                              │
//! │       └── abort()  ── ROLLBACK, then unlock                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row locks are always held before the unit of work begins, never the
//! other way round.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commit::locks::{LockTimedOut, RowLockSet, RowLocks};
use crate::error::{DbError, DbResult};
use crate::repository::STORE_ITEM_COLUMNS;
use crate::unit_of_work::UnitOfWork;
use larder_core::validation::{validate_price_cents, validate_stock_quantity};
use larder_core::{CoreError, IngredientDemand, Money, StoreItem, StoreItemId, ValidationError};

// =============================================================================
// Errors
// =============================================================================

/// Stock ledger failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An item has less on hand than the demand requires.
    #[error(
        "Insufficient stock for store item {store_item_id}: required {required}, available {available}"
    )]
    InsufficientStock {
        store_item_id: StoreItemId,
        required: i64,
        available: i64,
    },

    /// Row locks could not all be acquired before the deadline.
    #[error("Timed out after {waited_ms} ms waiting for the stock lock on store item {store_item_id}")]
    LockTimeout {
        store_item_id: StoreItemId,
        waited_ms: u64,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Db(DbError::Invalid(err))
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                store_item_id,
                required,
                available,
            } => LedgerError::InsufficientStock {
                store_item_id,
                required,
                available,
            },
            CoreError::Validation(e) => LedgerError::Db(DbError::Invalid(e)),
            other => LedgerError::Db(DbError::Internal(other.to_string())),
        }
    }
}

impl From<LockTimedOut> for LedgerError {
    fn from(err: LockTimedOut) -> Self {
        LedgerError::LockTimeout {
            store_item_id: err.store_item_id,
            waited_ms: err.waited.as_millis() as u64,
        }
    }
}

// =============================================================================
// Reservation Token
// =============================================================================

/// State of one store item as read and written under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSnapshot {
    pub store_item_id: StoreItemId,
    pub quantity_before: i64,
    pub quantity_after: i64,
    /// Cost per unit at the moment of the decrement. Cost logs use this.
    pub cost_per_unit: Money,
}

/// Reserved stock: held row locks plus the open unit of work that already
/// contains the decrements.
///
/// Dropping a token without calling [`commit`](Self::commit) or
/// [`abort`](Self::abort) discards the transaction.
#[derive(Debug)]
pub struct ReservationToken {
    id: Uuid,
    snapshots: BTreeMap<StoreItemId, StockSnapshot>,
    uow: UnitOfWork,
    // Declared after `uow` so the transaction ends before the locks drop.
    locks: RowLockSet,
}

impl ReservationToken {
    /// Identifier for correlating log events of one commit attempt.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot for one reserved store item.
    pub fn snapshot(&self, store_item_id: StoreItemId) -> Option<&StockSnapshot> {
        self.snapshots.get(&store_item_id)
    }

    /// All snapshots in ascending store item id.
    pub fn snapshots(&self) -> impl Iterator<Item = &StockSnapshot> {
        self.snapshots.values()
    }

    /// Connection of the reservation's unit of work, for writes that must
    /// commit or roll back together with the decrement.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        self.uow.conn()
    }

    /// Commits the unit of work, then releases the row locks.
    pub async fn commit(self) -> DbResult<()> {
        let ReservationToken { id, uow, locks, .. } = self;

        let result = uow.commit().await;
        let released = locks.len();
        drop(locks);

        match &result {
            Ok(()) => debug!(token = %id, released, "Reservation committed"),
            Err(e) => warn!(token = %id, error = %e, "Reservation commit failed"),
        }
        result
    }

    /// Rolls the unit of work back, then releases the row locks.
    pub async fn abort(self) -> DbResult<()> {
        let ReservationToken { id, uow, locks, .. } = self;

        let result = uow.rollback().await;
        drop(locks);

        debug!(token = %id, "Reservation aborted");
        result
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Lock-protected access to store item quantities and costs.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    locks: Arc<RowLocks>,
    lock_timeout: Duration,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, locks: Arc<RowLocks>, lock_timeout: Duration) -> Self {
        StockLedger {
            pool,
            locks,
            lock_timeout,
        }
    }

    /// Locks every demanded item, verifies availability and decrements.
    ///
    /// An empty demand still yields a token (with an open unit of work and
    /// no locks), so orders of stock-free items commit the same way.
    ///
    /// ## Errors
    /// - `InsufficientStock` naming the lowest failing store item id; nothing
    ///   is decremented
    /// - `LockTimeout` if the locks are not all held within the lock timeout
    /// - `Db` for storage failures, including `DbError::Busy`
    pub async fn check_and_reserve(
        &self,
        demand: &IngredientDemand,
    ) -> Result<ReservationToken, LedgerError> {
        let id = Uuid::new_v4();
        let ids = demand.store_item_ids();

        debug!(token = %id, items = ids.len(), "Acquiring stock locks");

        let locks = self
            .locks
            .acquire(&ids, self.lock_timeout)
            .await
            .map_err(|timed_out| {
                warn!(
                    token = %id,
                    store_item_id = timed_out.store_item_id,
                    "Stock lock timeout"
                );
                LedgerError::from(timed_out)
            })?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let reserved = reserve_locked(uow.conn(), demand).await;
        match reserved {
            Ok(snapshots) => {
                debug!(token = %id, items = snapshots.len(), "Stock reserved");
                Ok(ReservationToken {
                    id,
                    snapshots,
                    uow,
                    locks,
                })
            }
            Err(err) => {
                debug!(token = %id, error = %err, "Stock reservation rejected");
                if let Err(rollback) = uow.rollback().await {
                    warn!(token = %id, error = %rollback, "Rollback after rejected reservation failed");
                }
                Err(err)
            }
        }
    }

    /// Adds delivered stock to an item.
    ///
    /// ## Errors
    /// - `Db(Invalid)` if `quantity` is not positive, or if the new quantity
    ///   on hand would overflow
    /// - `Db(NotFound)` if the item does not exist
    pub async fn restock(
        &self,
        store_item_id: StoreItemId,
        quantity: i64,
    ) -> Result<StoreItem, LedgerError> {
        validate_stock_quantity("quantity", quantity, false)?;

        let _locks = self.locks.acquire(&[store_item_id], self.lock_timeout).await?;
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let result = restock_locked(uow.conn(), store_item_id, quantity).await;

        let item = finish(uow, result).await?;
        info!(
            store_item_id = store_item_id,
            added = quantity,
            quantity_on_hand = item.quantity_on_hand,
            "Stock restocked"
        );
        Ok(item)
    }

    /// Changes the cost per unit used by future sales.
    ///
    /// Cost logs of committed sales keep the cost they were recorded with.
    pub async fn set_cost_per_unit(
        &self,
        store_item_id: StoreItemId,
        cost_per_unit: Money,
    ) -> Result<StoreItem, LedgerError> {
        validate_price_cents("cost_per_unit", cost_per_unit.cents())?;

        let _locks = self.locks.acquire(&[store_item_id], self.lock_timeout).await?;
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let result = sqlx::query_as::<_, StoreItem>(&format!(
            "UPDATE store_items SET cost_per_unit_cents = ?2, updated_at = ?3 \
             WHERE id = ?1 RETURNING {STORE_ITEM_COLUMNS}"
        ))
        .bind(store_item_id)
        .bind(cost_per_unit.cents())
        .bind(Utc::now())
        .fetch_optional(uow.conn())
        .await
        .map_err(DbError::from)
        .and_then(|row| row.ok_or_else(|| DbError::not_found("StoreItem", store_item_id)));

        let item = finish(uow, result).await?;
        info!(store_item_id = store_item_id, cost_per_unit = %cost_per_unit, "Stock cost updated");
        Ok(item)
    }
}

/// Adds `quantity` to an item's stock with an overflow check, on a
/// connection whose transaction runs under the item's lock.
async fn restock_locked(
    conn: &mut SqliteConnection,
    store_item_id: StoreItemId,
    quantity: i64,
) -> DbResult<StoreItem> {
    let on_hand: Option<i64> =
        sqlx::query_scalar("SELECT quantity_on_hand FROM store_items WHERE id = ?1")
            .bind(store_item_id)
            .fetch_optional(&mut *conn)
            .await?;

    let on_hand = on_hand.ok_or_else(|| DbError::not_found("StoreItem", store_item_id))?;
    let restocked = on_hand
        .checked_add(quantity)
        .ok_or_else(|| ValidationError::overflow("quantity_on_hand"))?;

    let item = sqlx::query_as::<_, StoreItem>(&format!(
        "UPDATE store_items SET quantity_on_hand = ?2, updated_at = ?3 \
         WHERE id = ?1 RETURNING {STORE_ITEM_COLUMNS}"
    ))
    .bind(store_item_id)
    .bind(restocked)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}

/// Reads, checks and decrements every demanded item on a connection whose
/// transaction already runs under the items' locks.
async fn reserve_locked(
    conn: &mut SqliteConnection,
    demand: &IngredientDemand,
) -> Result<BTreeMap<StoreItemId, StockSnapshot>, LedgerError> {
    let mut on_hand = BTreeMap::new();
    let mut costs = BTreeMap::new();

    for store_item_id in demand.store_item_ids() {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT quantity_on_hand, cost_per_unit_cents FROM store_items WHERE id = ?1",
        )
        .bind(store_item_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?;

        let (quantity, cost_cents) =
            row.ok_or_else(|| DbError::not_found("StoreItem", store_item_id))?;
        on_hand.insert(store_item_id, quantity);
        costs.insert(store_item_id, Money::from_cents(cost_cents));
    }

    demand.check_available(&on_hand)?;

    let now = Utc::now();
    let mut snapshots = BTreeMap::new();

    for (store_item_id, required) in demand.iter() {
        let available = on_hand.get(&store_item_id).copied().unwrap_or(0);

        let result = sqlx::query(
            "UPDATE store_items \
             SET quantity_on_hand = quantity_on_hand - ?2, updated_at = ?3 \
             WHERE id = ?1 AND quantity_on_hand >= ?2",
        )
        .bind(store_item_id)
        .bind(required)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        // Only reachable if the row changed outside the lock table
        if result.rows_affected() == 0 {
            return Err(LedgerError::InsufficientStock {
                store_item_id,
                required,
                available,
            });
        }

        snapshots.insert(
            store_item_id,
            StockSnapshot {
                store_item_id,
                quantity_before: available,
                quantity_after: available - required,
                cost_per_unit: costs.get(&store_item_id).copied().unwrap_or_default(),
            },
        );
    }

    Ok(snapshots)
}

/// Commits on success, rolls back on failure.
async fn finish<T>(uow: UnitOfWork, result: DbResult<T>) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = uow.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(err.into())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    struct Kitchen {
        db: Database,
        bun: StoreItemId,
        patty: StoreItemId,
        cheese: StoreItemId,
    }

    async fn kitchen(config: DbConfig) -> Kitchen {
        let db = Database::new(config).await.unwrap();
        let items = db.store_items();
        let bun = items.insert("Bun", 100, Money::from_cents(50)).await.unwrap().id;
        let patty = items.insert("Patty", 50, Money::from_cents(150)).await.unwrap().id;
        let cheese = items.insert("Cheese", 2, Money::from_cents(40)).await.unwrap().id;
        Kitchen {
            db,
            bun,
            patty,
            cheese,
        }
    }

    async fn on_hand(db: &Database, id: StoreItemId) -> i64 {
        db.store_items()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .quantity_on_hand
    }

    #[tokio::test]
    async fn test_reserve_and_commit_decrements() {
        let k = kitchen(DbConfig::in_memory()).await;
        let demand: IngredientDemand = [(k.bun, 20), (k.patty, 10)].into_iter().collect();

        let token = k.db.ledger().check_and_reserve(&demand).await.unwrap();

        let bun = token.snapshot(k.bun).copied().unwrap();
        assert_eq!((bun.quantity_before, bun.quantity_after), (100, 80));
        assert_eq!(bun.cost_per_unit, Money::from_cents(50));
        assert_eq!(token.snapshots().count(), 2);

        token.commit().await.unwrap();

        assert_eq!(on_hand(&k.db, k.bun).await, 80);
        assert_eq!(on_hand(&k.db, k.patty).await, 40);
    }

    #[tokio::test]
    async fn test_abort_restores_stock() {
        let k = kitchen(DbConfig::in_memory()).await;
        let demand: IngredientDemand = [(k.patty, 30)].into_iter().collect();

        let token = k.db.ledger().check_and_reserve(&demand).await.unwrap();
        token.abort().await.unwrap();

        assert_eq!(on_hand(&k.db, k.patty).await, 50);
    }

    #[tokio::test]
    async fn test_insufficient_names_lowest_failing_item_and_changes_nothing() {
        let k = kitchen(DbConfig::in_memory()).await;
        let demand: IngredientDemand = [(k.bun, 10), (k.patty, 60), (k.cheese, 5)]
            .into_iter()
            .collect();

        let err = k.db.ledger().check_and_reserve(&demand).await.unwrap_err();
        match err {
            LedgerError::InsufficientStock {
                store_item_id,
                required,
                available,
            } => {
                assert_eq!(store_item_id, k.patty);
                assert_eq!((required, available), (60, 50));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(on_hand(&k.db, k.bun).await, 100);
        assert_eq!(on_hand(&k.db, k.patty).await, 50);
        assert_eq!(on_hand(&k.db, k.cheese).await, 2);
    }

    #[tokio::test]
    async fn test_exact_stock_drains_to_zero() {
        let k = kitchen(DbConfig::in_memory()).await;
        let demand: IngredientDemand = [(k.cheese, 2)].into_iter().collect();

        k.db.ledger()
            .check_and_reserve(&demand)
            .await
            .unwrap()
            .commit()
            .await
            .unwrap();

        assert_eq!(on_hand(&k.db, k.cheese).await, 0);
    }

    #[tokio::test]
    async fn test_lock_timeout() {
        let k = kitchen(DbConfig::in_memory().lock_timeout(Duration::from_millis(50))).await;
        let held = k
            .db
            .row_locks()
            .acquire(&[k.patty], Duration::from_millis(50))
            .await
            .unwrap();

        let demand: IngredientDemand = [(k.bun, 1), (k.patty, 1)].into_iter().collect();
        let err = k.db.ledger().check_and_reserve(&demand).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::LockTimeout { store_item_id, .. } if store_item_id == k.patty
        ));

        drop(held);
        assert_eq!(on_hand(&k.db, k.bun).await, 100);
    }

    #[tokio::test]
    async fn test_restock_and_cost_update() {
        let k = kitchen(DbConfig::in_memory()).await;
        let ledger = k.db.ledger();

        let patty = ledger.restock(k.patty, 25).await.unwrap();
        assert_eq!(patty.quantity_on_hand, 75);

        let patty = ledger
            .set_cost_per_unit(k.patty, Money::from_cents(175))
            .await
            .unwrap();
        assert_eq!(patty.cost_per_unit_cents, 175);

        assert!(matches!(
            ledger.restock(k.patty, 0).await,
            Err(LedgerError::Db(DbError::Invalid(_)))
        ));
        assert!(matches!(
            ledger.restock(9999, 5).await,
            Err(LedgerError::Db(DbError::NotFound { .. }))
        ));
        assert!(matches!(
            ledger.set_cost_per_unit(k.patty, Money::from_cents(-5)).await,
            Err(LedgerError::Db(DbError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn test_restock_overflow_leaves_stock_unchanged() {
        let k = kitchen(DbConfig::in_memory()).await;
        let ledger = k.db.ledger();

        let result = ledger.restock(k.patty, i64::MAX).await;
        assert!(matches!(
            result,
            Err(LedgerError::Db(DbError::Invalid(ValidationError::Overflow { .. })))
        ));

        assert_eq!(on_hand(&k.db, k.patty).await, 50);

        // The lock was released and the item is still usable
        assert_eq!(ledger.restock(k.patty, 1).await.unwrap().quantity_on_hand, 51);
    }
}
