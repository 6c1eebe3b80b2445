//! Read-only access to the RUC store

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

use crate::config::StoreConfig;

/// Open a lazily connected, read-only pool over the store.
///
/// No connection is attempted until the first query, so the server starts
/// even before `ruc-ingest` has produced a store.
pub fn connect_lazy(config: &StoreConfig) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .read_only(true)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_lazy_with(options);

    tracing::info!(
        path = %config.path.display(),
        max_connections = config.max_connections,
        "Store pool configured"
    );

    pool
}

/// Reachability of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreStatus {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "not found")]
    NotFound,
    #[serde(rename = "unreachable")]
    Unreachable,
}

impl StoreStatus {
    pub fn is_connected(self) -> bool {
        self == StoreStatus::Connected
    }
}

/// The store file exists and answers `SELECT 1`.
pub async fn health_check(pool: &SqlitePool, path: &Path) -> StoreStatus {
    if !path.exists() {
        return StoreStatus::NotFound;
    }

    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => StoreStatus::Connected,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Store health check failed");
            StoreStatus::Unreachable
        },
    }
}
