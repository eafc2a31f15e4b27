//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size (default: 5)
    pub db_max_connections: u32,

    /// How long a sale waits for stock row locks, in milliseconds
    pub stock_lock_timeout_ms: u64,

    /// Upper bound for `perPage` on sale listings
    pub sales_page_size_limit: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            database_path: "./larder.db".to_string(),
            db_max_connections: 5,
            stock_lock_timeout_ms: 5000,
            sales_page_size_limit: 100,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            http_port: parse_var(&lookup, "HTTP_PORT", defaults.http_port)?,

            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_var(
                &lookup,
                "DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            stock_lock_timeout_ms: parse_var(
                &lookup,
                "STOCK_LOCK_TIMEOUT_MS",
                defaults.stock_lock_timeout_ms,
            )?,

            sales_page_size_limit: parse_var(
                &lookup,
                "SALES_PAGE_SIZE_LIMIT",
                defaults.sales_page_size_limit,
            )?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if config.sales_page_size_limit < 1 {
            return Err(ConfigError::InvalidValue("SALES_PAGE_SIZE_LIMIT".to_string()));
        }
        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("DATABASE_PATH".to_string()));
        }

        Ok(config)
    }

    pub fn stock_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.stock_lock_timeout_ms)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
