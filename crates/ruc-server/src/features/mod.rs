//! Feature modules implementing the RUC lookup API
//!
//! Each feature is a vertical slice with its own `queries/`, `routes.rs`
//! and `types.rs`. The store is read-only, so there are no commands.
//!
//! # Features
//!
//! - **lookup**: exact RUC lookup and combined key/name search

pub mod lookup;

use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;

use lookup::routes::LookupError;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Read-only pool over the store
    pub store: SqlitePool,
    /// Store location, checked before each query
    pub store_path: PathBuf,
    /// Upper bound for search limits
    pub limit_max: i64,
}

impl FeatureState {
    /// A missing store means ingestion has not run yet.
    pub(crate) fn ensure_store(&self) -> Result<(), LookupError> {
        if self.store_path.is_file() {
            Ok(())
        } else {
            Err(LookupError::StoreUnavailable(self.store_path.display().to_string()))
        }
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/ruc/:ruc` - exact lookup
/// - `/search` - combined search
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().merge(lookup::lookup_routes().with_state(state))
}
