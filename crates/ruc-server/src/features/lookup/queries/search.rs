//! Combined lookup: an exact key match wins, otherwise a substring search
//! over the business name.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::get_by_ruc::find_exact;
use crate::features::lookup::types::{LookupRecord, RucRow, SELECT_COLUMNS};

pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Name,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub match_type: MatchType,
    pub results: Vec<LookupRecord>,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Query is required")]
    QueryRequired,
    #[error("Limit must be between 1 and {max}, got {got}")]
    InvalidLimit { got: i64, max: i64 },
    #[error("No results for '{0}'")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SearchQuery {
    pub fn validate(&self, limit_max: i64) -> Result<(), SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::QueryRequired);
        }

        if let Some(limit) = self.limit {
            if !(1..=limit_max).contains(&limit) {
                return Err(SearchError::InvalidLimit {
                    got: limit,
                    max: limit_max,
                });
            }
        }

        Ok(())
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Run a search.
///
/// The name search always fetches up to `limit_max` rows and the result is
/// truncated to the requested limit afterwards, so `total` never exceeds
/// `limit_max`.
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    query: SearchQuery,
    limit_max: i64,
) -> Result<SearchResponse, SearchError> {
    query.validate(limit_max)?;

    let term = query.query.trim();

    if let Some(record) = find_exact(&pool, term).await? {
        return Ok(SearchResponse {
            match_type: MatchType::Exact,
            results: vec![record],
            total: 1,
        });
    }

    // LIKE wildcards typed by the caller are passed through as-is.
    let sql = format!("{} WHERE razon_social LIKE ? LIMIT ?", SELECT_COLUMNS);
    let rows = sqlx::query_as::<_, RucRow>(&sql)
        .bind(format!("%{}%", term))
        .bind(limit_max)
        .fetch_all(&pool)
        .await?;

    if rows.is_empty() {
        return Err(SearchError::NotFound(term.to_string()));
    }

    let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
    let results: Vec<LookupRecord> = rows.into_iter().take(limit).map(LookupRecord::from).collect();

    tracing::debug!(term, found = results.len(), "Name search completed");

    Ok(SearchResponse {
        match_type: MatchType::Name,
        total: results.len(),
        results,
    })
}
