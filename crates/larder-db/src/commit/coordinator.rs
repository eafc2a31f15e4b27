//! # Sale Commit Coordinator
//!
//! Turns an order into a committed sale in one atomic unit of work.
//!
//! ## Commit Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(lines)                                          state: Pending  │
//! │       │                                                                 │
//! │  1.   validate_order_lines ─────────────────► Validation               │
//! │  2.   menu.load_recipe_book + resolve ──────► UnknownMenuItem          │
//! │  3.   price lines, total (checked) ─────────► Validation (overflow)    │
//! │  4.   ledger.check_and_reserve ─────────────► InsufficientStock        │
//! │       │                                      ConcurrencyConflict       │
//! │       │  ── from here on, a failure aborts the reservation ──          │
//! │  5.   insert Sale, then one SaleDetail per line                        │
//! │  6.   one SaleCostLog per (line, recipe entry) at the snapshot cost    │
//! │       and a checked COGS total ─────────────► Validation (overflow)    │
//! │  7.   token.commit() ───────────────────────► Committed                │
//! │                                               (or Aborted on error)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1 to 3 touch no stock and hold no lock. Nothing is retried here;
//! callers decide using [`SaleCommitError::is_retryable`].

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commit::cost_basis::CostBasisRecorder;
use crate::commit::ledger::{LedgerError, ReservationToken, StockLedger};
use crate::error::DbError;
use crate::repository::menu::MenuRepository;
use crate::repository::sale::SaleRepository;
use larder_core::recipe::consumed_by;
use larder_core::validation::validate_order_lines;
use larder_core::{
    CommittedSale, CoreError, MenuItemId, Money, OrderLine, RecipeBook, StoreItemId,
    ValidationError,
};

// =============================================================================
// Errors
// =============================================================================

/// Why a sale was not committed. In every case nothing was persisted.
#[derive(Debug, Error)]
pub enum SaleCommitError {
    /// The order is malformed (no lines, non-positive quantity, overflow).
    #[error("Invalid order: {0}")]
    Validation(#[from] ValidationError),

    /// A line references a menu item that does not exist or was retired.
    #[error("Unknown menu item: {menu_item_id}")]
    UnknownMenuItem { menu_item_id: MenuItemId },

    /// Not enough of one ingredient. Names the lowest failing store item id.
    #[error(
        "Insufficient stock for store item {store_item_id}: required {required}, available {available}"
    )]
    InsufficientStock {
        store_item_id: StoreItemId,
        required: i64,
        available: i64,
    },

    /// Lock wait or database write lock timed out.
    ///
    /// ## When This Occurs
    /// - Another terminal held the same ingredients past the lock timeout
    /// - SQLite stayed busy past the busy timeout
    /// - No pooled connection freed up in time
    #[error("Concurrency conflict: {reason}")]
    ConcurrencyConflict { reason: String },

    /// Storage failure. The unit of work was rolled back.
    #[error("Persistence failure: {0}")]
    Persistence(DbError),
}

impl SaleCommitError {
    /// True if the same order may succeed when submitted again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SaleCommitError::ConcurrencyConflict { .. })
    }
}

impl From<CoreError> for SaleCommitError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownMenuItem { menu_item_id } => {
                SaleCommitError::UnknownMenuItem { menu_item_id }
            }
            CoreError::InsufficientStock {
                store_item_id,
                required,
                available,
            } => SaleCommitError::InsufficientStock {
                store_item_id,
                required,
                available,
            },
            CoreError::Validation(e) => SaleCommitError::Validation(e),
        }
    }
}

impl From<DbError> for SaleCommitError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Invalid(e) => SaleCommitError::Validation(e),
            e if e.is_contention() => SaleCommitError::ConcurrencyConflict {
                reason: e.to_string(),
            },
            e => SaleCommitError::Persistence(e),
        }
    }
}

impl From<LedgerError> for SaleCommitError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                store_item_id,
                required,
                available,
            } => SaleCommitError::InsufficientStock {
                store_item_id,
                required,
                available,
            },
            timeout @ LedgerError::LockTimeout { .. } => SaleCommitError::ConcurrencyConflict {
                reason: timeout.to_string(),
            },
            LedgerError::Db(e) => e.into(),
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// A priced order line, computed before any lock is taken.
#[derive(Debug, Clone, Copy)]
struct PricedLine {
    line: OrderLine,
    unit_price: Money,
    subtotal: Money,
}

/// Commits sales. Stateless: build one per request with
/// [`Database::sale_commits`](crate::Database::sale_commits).
#[derive(Debug, Clone)]
pub struct SaleCommitCoordinator {
    menu: MenuRepository,
    ledger: StockLedger,
    recorder: CostBasisRecorder,
}

impl SaleCommitCoordinator {
    pub fn new(menu: MenuRepository, ledger: StockLedger) -> Self {
        SaleCommitCoordinator {
            menu,
            ledger,
            recorder: CostBasisRecorder::new(),
        }
    }

    /// Validates, reserves stock and persists the sale with its details and
    /// cost logs, all or nothing.
    pub async fn commit(&self, lines: &[OrderLine]) -> Result<CommittedSale, SaleCommitError> {
        validate_order_lines(lines)?;

        let menu_item_ids: Vec<MenuItemId> = lines.iter().map(|l| l.menu_item_id).collect();
        let book = self.menu.load_recipe_book(&menu_item_ids).await?;

        let demand = book.resolve(lines)?;
        let (priced, total) = price_lines(&book, lines)?;

        let mut token = self.ledger.check_and_reserve(&demand).await?;
        let token_id = token.id();

        let written = self.write_sale(&mut token, &book, &priced, total).await;

        match written {
            Ok(committed) => {
                token.commit().await?;
                info!(
                    token = %token_id,
                    sale_id = committed.sale.id,
                    lines = committed.details.len(),
                    total = %committed.sale.total_amount(),
                    "Sale committed"
                );
                Ok(committed)
            }
            Err(err) => {
                warn!(token = %token_id, error = %err, "Sale aborted");
                if let Err(abort) = token.abort().await {
                    warn!(token = %token_id, error = %abort, "Abort failed");
                }
                Err(err)
            }
        }
    }

    /// Steps 5 and 6: every row lands in the token's unit of work.
    async fn write_sale(
        &self,
        token: &mut ReservationToken,
        book: &RecipeBook,
        priced: &[PricedLine],
        total: Money,
    ) -> Result<CommittedSale, SaleCommitError> {
        let sale = SaleRepository::insert_sale(token.conn(), Utc::now(), total).await?;

        let mut details = Vec::with_capacity(priced.len());
        let mut cost_logs = Vec::new();

        for p in priced {
            let detail = SaleRepository::insert_detail(
                token.conn(),
                sale.id,
                &p.line,
                p.unit_price,
                p.subtotal,
            )
            .await?;

            for entry in book.recipe(p.line.menu_item_id)? {
                let quantity_used = consumed_by(entry, &p.line)?;
                let cost_per_unit = token
                    .snapshot(entry.store_item_id)
                    .map(|s| s.cost_per_unit)
                    .ok_or_else(|| {
                        DbError::Internal(format!(
                            "store item {} missing from reservation",
                            entry.store_item_id
                        ))
                    })?;

                let log = self
                    .recorder
                    .record(
                        token.conn(),
                        detail.id,
                        entry.store_item_id,
                        quantity_used,
                        cost_per_unit,
                    )
                    .await?;
                cost_logs.push(log);
            }

            details.push(detail);
        }

        debug!(
            token = %token.id(),
            sale_id = sale.id,
            cost_logs = cost_logs.len(),
            "Sale rows written"
        );

        let committed = CommittedSale {
            sale,
            details,
            cost_logs,
        };
        // A committed sale must always have a representable cost of goods
        committed.cost_of_goods()?;

        Ok(committed)
    }
}

/// Snapshots each line's unit price and sums the total with overflow checks.
fn price_lines(
    book: &RecipeBook,
    lines: &[OrderLine],
) -> Result<(Vec<PricedLine>, Money), SaleCommitError> {
    let mut total = Money::zero();
    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        let unit_price = book.menu_item(line.menu_item_id)?.unit_price();
        let subtotal = unit_price
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(|| ValidationError::overflow("subtotal"))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| ValidationError::overflow("total"))?;

        priced.push(PricedLine {
            line: *line,
            unit_price,
            subtotal,
        });
    }

    Ok((priced, total))
}

// =============================================================================
// Unit Tests
// =============================================================================
