//! # larder-db: Database Layer for Larder
//!
//! SQLite storage for the restaurant catalog and sale history, plus the
//! transactional sale commit that decrements ingredient stock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Larder Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /sales)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     larder-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    commit     │    │ Repositories │  │   │
//! │  │   │   (pool.rs)   │    │               │    │              │  │   │
//! │  │   │               │    │ Coordinator   │───►│ MenuRepo     │  │   │
//! │  │   │ SqlitePool    │◄───│ StockLedger   │    │ StoreItemRepo│  │   │
//! │  │   │ RowLocks      │    │ CostBasis     │───►│ SaleRepo     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                              │                                  │   │
//! │  │                              ▼                                  │   │
//! │  │                     UnitOfWork (BEGIN IMMEDIATE)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`unit_of_work`] - One write transaction on one connection
//! - [`repository`] - Menu, store item and sale repositories
//! - [`commit`] - Row locks, stock ledger, cost basis, sale commit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use larder_db::{Database, DbConfig};
//! use larder_core::OrderLine;
//!
//! let db = Database::new(DbConfig::new("larder.db")).await?;
//! let sale = db.sale_commits().commit(&[OrderLine::new(burger_id, 2)]).await?;
//! println!("sale {} total {}", sale.sale.id, sale.sale.total_amount());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commit;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use commit::{
    CostBasisRecorder, LedgerError, ReservationToken, RowLocks, SaleCommitCoordinator,
    SaleCommitError, StockLedger, StockSnapshot,
};

// Repository re-exports for convenience
pub use repository::menu::MenuRepository;
pub use repository::sale::SaleRepository;
pub use repository::store_item::StoreItemRepository;
