use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::features::lookup::types::{LookupRecord, RucRow, SELECT_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRucQuery {
    pub ruc: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetRucError {
    #[error("RUC is required")]
    RucRequired,
    #[error("RUC {0} not found")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GetRucQuery {
    pub fn validate(&self) -> Result<(), GetRucError> {
        if self.ruc.trim().is_empty() {
            return Err(GetRucError::RucRequired);
        }
        Ok(())
    }
}

/// Fetch the first row whose key equals `ruc` exactly.
pub(crate) async fn find_exact(
    pool: &SqlitePool,
    ruc: &str,
) -> Result<Option<LookupRecord>, sqlx::Error> {
    let sql = format!("{} WHERE ruc = ? LIMIT 1", SELECT_COLUMNS);
    let row = sqlx::query_as::<_, RucRow>(&sql)
        .bind(ruc)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(LookupRecord::from))
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: SqlitePool, query: GetRucQuery) -> Result<LookupRecord, GetRucError> {
    query.validate()?;

    let ruc = query.ruc.trim();
    find_exact(&pool, ruc)
        .await?
        .ok_or_else(|| GetRucError::NotFound(ruc.to_string()))
}
