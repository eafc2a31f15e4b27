//! Error types for the HTTP API.
//!
//! Every failure leaves as `{ code, message, retryable }`:
//!
//! ```text
//! SaleCommitError::Validation          → 422 VALIDATION_ERROR
//! SaleCommitError::UnknownMenuItem     → 404 UNKNOWN_MENU_ITEM
//! SaleCommitError::InsufficientStock   → 409 INSUFFICIENT_STOCK
//! SaleCommitError::ConcurrencyConflict → 503 CONCURRENCY_CONFLICT (retryable)
//! SaleCommitError::Persistence         → 500 DATABASE_ERROR
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use larder_db::{DbError, SaleCommitError};

/// HTTP-facing error.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retryable: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    retryable: bool,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            retryable: false,
        }
    }

    fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn not_found(resource: &str, id: i64) -> Self {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} {id} not found"),
        )
    }

    /// Hides storage details from the client and logs them instead.
    pub(crate) fn database(err: &DbError) -> Self {
        error!(error = %err, "Database failure");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "DATABASE_ERROR",
            "A storage error occurred",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        self.code
    }
}

impl From<SaleCommitError> for ApiError {
    fn from(err: SaleCommitError) -> Self {
        let message = err.to_string();
        match err {
            SaleCommitError::Validation(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
            }
            SaleCommitError::UnknownMenuItem { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "UNKNOWN_MENU_ITEM", message)
            }
            SaleCommitError::InsufficientStock { .. } => {
                ApiError::new(StatusCode::CONFLICT, "INSUFFICIENT_STOCK", message)
            }
            SaleCommitError::ConcurrencyConflict { .. } => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "CONCURRENCY_CONFLICT", message)
                    .retryable()
            }
            SaleCommitError::Persistence(db) => ApiError::database(&db),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Invalid(e) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string())
            }
            DbError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            e if e.is_contention() => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "CONCURRENCY_CONFLICT", e.to_string())
                    .retryable()
            }
            e => ApiError::database(&e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
            retryable: self.retryable,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::ValidationError;

    #[test]
    fn test_commit_error_mapping() {
        let cases: Vec<(SaleCommitError, StatusCode, &str)> = vec![
            (
                ValidationError::Required {
                    field: "lines".into(),
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (
                SaleCommitError::UnknownMenuItem { menu_item_id: 4 },
                StatusCode::NOT_FOUND,
                "UNKNOWN_MENU_ITEM",
            ),
            (
                SaleCommitError::InsufficientStock {
                    store_item_id: 2,
                    required: 26,
                    available: 20,
                },
                StatusCode::CONFLICT,
                "INSUFFICIENT_STOCK",
            ),
            (
                SaleCommitError::ConcurrencyConflict {
                    reason: "lock timeout".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "CONCURRENCY_CONFLICT",
            ),
            (
                SaleCommitError::Persistence(DbError::QueryFailed("disk full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let retryable = err.is_retryable();
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
            assert_eq!(api.retryable, retryable);
        }
    }

    #[test]
    fn test_database_details_are_not_leaked() {
        let api = ApiError::from(DbError::QueryFailed("no such table: sales".into()));
        assert!(!api.message.contains("sales"));
    }
}
