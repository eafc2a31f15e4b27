//! # Larder API
//!
//! HTTP server that POS terminals post orders to.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Larder API Routes                              │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐  │
//! │  │  POST /sales       │  │  GET /sales        │  │  GET /health     │  │
//! │  │                    │  │  GET /sales/{id}   │  │                  │  │
//! │  │ SaleCommit         │  │ SaleRepository     │  │ ping + migration │  │
//! │  │ Coordinator        │  │ (history, COGS)    │  │ status           │  │
//! │  └─────────┬──────────┘  └─────────┬──────────┘  └────────┬─────────┘  │
//! │            └───────────────────────┼──────────────────────┘            │
//! │                                    ▼                                    │
//! │                        larder_db::Database (shared)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP server port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./larder.db)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `STOCK_LOCK_TIMEOUT_MS` - Stock lock wait (default: 5000)
//! - `SALES_PAGE_SIZE_LIMIT` - Max `perPage` on listings (default: 100)
//! - `RUST_LOG` - Log filter (default: info)

pub mod config;
pub mod error;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

// Re-exports
pub use config::ApiConfig;
pub use error::ApiError;

use larder_db::Database;

/// Shared application state. Cheap to clone per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState { db, config }
    }
}

/// Builds the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/sales",
            post(routes::sales::create_sale).get(routes::sales::list_sales),
        )
        .route("/sales/{id}", get(routes::sales::get_sale))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
