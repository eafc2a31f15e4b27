//! # Sale Commit
//!
//! The transactional write path: stock row locks, the stock ledger, cost
//! basis recording and the coordinator that ties them into one unit of work.
//!
//! - [`locks`] - Per store item async locks
//! - [`ledger`] - Check-and-reserve, restock, cost updates
//! - [`cost_basis`] - Cost-of-goods log rows
//! - [`coordinator`] - Order → committed sale

pub mod coordinator;
pub mod cost_basis;
pub mod ledger;
pub mod locks;

pub use coordinator::{SaleCommitCoordinator, SaleCommitError};
pub use cost_basis::CostBasisRecorder;
pub use ledger::{LedgerError, ReservationToken, StockLedger, StockSnapshot};
pub use locks::{LockTimedOut, RowLockSet, RowLocks};
