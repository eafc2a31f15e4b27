//! Health check endpoint for load balancers and monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::AppState;
use larder_db::migrations::migration_status;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "serving" or "not_serving"
    pub status: String,
    pub database: bool,
    pub migrations_applied: usize,
    pub migrations_total: usize,
    pub server_time: DateTime<Utc>,
}

/// 200 when the database answers and is fully migrated, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;

    let (applied, total) = match migration_status(state.db.pool()).await {
        Ok(status) => (status.applied, status.total),
        Err(e) => {
            warn!(error = %e, "Migration status unavailable");
            (0, 0)
        }
    };

    let serving = database && total > 0 && applied >= total;
    let status = if serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if serving { "serving" } else { "not_serving" }.to_string(),
            database,
            migrations_applied: applied,
            migrations_total: total,
            server_time: Utc::now(),
        }),
    )
}
