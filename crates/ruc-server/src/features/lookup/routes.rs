use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::queries::{GetRucError, GetRucQuery, SearchError, SearchQuery};

pub fn lookup_routes() -> Router<FeatureState> {
    Router::new()
        .route("/ruc/:ruc", get(get_ruc))
        .route("/search", get(search))
}

#[tracing::instrument(skip(state))]
async fn get_ruc(
    State(state): State<FeatureState>,
    Path(ruc): Path<String>,
) -> Result<Response, LookupError> {
    state.ensure_store()?;

    let record = super::queries::get_by_ruc::handle(state.store, GetRucQuery { ruc }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, query))]
async fn search(
    State(state): State<FeatureState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, LookupError> {
    let Query(query) = query?;
    tracing::debug!(q = %query.query, limit = ?query.limit, "Search requested");

    state.ensure_store()?;

    let response = super::queries::search::handle(state.store, query, state.limit_max).await?;

    tracing::debug!(
        match_type = ?response.match_type,
        total = response.total,
        "Search completed"
    );

    let meta = json!({
        "match_type": response.match_type,
        "total": response.total,
    });

    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response, meta)))
            .into_response(),
    )
}

#[derive(Debug)]
pub enum LookupError {
    StoreUnavailable(String),
    InvalidQueryString(QueryRejection),
    Get(GetRucError),
    Search(SearchError),
}

impl From<GetRucError> for LookupError {
    fn from(err: GetRucError) -> Self {
        Self::Get(err)
    }
}

impl From<SearchError> for LookupError {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

impl From<QueryRejection> for LookupError {
    fn from(err: QueryRejection) -> Self {
        Self::InvalidQueryString(err)
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::StoreUnavailable(path) => AppError::StoreUnavailable(path),
            LookupError::InvalidQueryString(rejection) => {
                AppError::Validation(rejection.body_text())
            },
            LookupError::Get(GetRucError::Database(e))
            | LookupError::Search(SearchError::Database(e)) => AppError::Database(e),
            LookupError::Get(e @ GetRucError::RucRequired) => AppError::Validation(e.to_string()),
            LookupError::Search(e @ (SearchError::QueryRequired | SearchError::InvalidLimit { .. })) => {
                AppError::Validation(e.to_string())
            },
            LookupError::Get(e @ GetRucError::NotFound(_)) => AppError::NotFound(e.to_string()),
            LookupError::Search(e @ SearchError::NotFound(_)) => AppError::NotFound(e.to_string()),
        }
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(path) => write!(f, "Store not found at {}", path),
            Self::InvalidQueryString(e) => write!(f, "{}", e.body_text()),
            Self::Get(e) => write!(f, "{}", e),
            Self::Search(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LookupError::Search(SearchError::QueryRequired);
        assert!(err.to_string().contains("Query is required"));

        let err = LookupError::StoreUnavailable("data/ruc.sqlite".to_string());
        assert_eq!(err.to_string(), "Store not found at data/ruc.sqlite");
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (LookupError::Search(SearchError::QueryRequired), StatusCode::BAD_REQUEST),
            (
                LookupError::Search(SearchError::InvalidLimit { got: 0, max: 100 }),
                StatusCode::BAD_REQUEST,
            ),
            (LookupError::Get(GetRucError::NotFound("1".into())), StatusCode::NOT_FOUND),
            (
                LookupError::StoreUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LookupError::Get(GetRucError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_lookup_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(LookupError::Get(GetRucError::RucRequired)),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(LookupError::Search(SearchError::NotFound("x".into()))),
            AppError::NotFound(ref m) if m == "No results for 'x'"
        ));
    }
}
