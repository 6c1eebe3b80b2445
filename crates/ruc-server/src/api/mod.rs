pub mod response;

use crate::config::Config;
use crate::db::{self, StoreStatus};
use crate::features;
use crate::middleware;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower_http::compression::CompressionLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: SqlitePool,
    pub store_path: PathBuf,
}

/// Build the application router with all routes and middleware.
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        store: state.store.clone(),
        store_path: state.store_path.clone(),
        limit_max: config.search.limit_max,
    };

    let api_v1 = features::router(feature_state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "RUC Lookup API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "/health": "Service and store status",
            "/api/v1/ruc/{ruc}": "Exact lookup by RUC",
            "/api/v1/search?query={text}&limit={n}": "Exact RUC match, otherwise business name search",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = db::health_check(&state.store, &state.store_path).await;
    let status = if store.is_connected() { "healthy" } else { "warning" };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "database": store,
            "database_path": state.store_path.display().to_string(),
        })),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn missing_store_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store = StoreConfig {
            path: dir.path().join("ruc.sqlite"),
            ..config.store
        };
        let state = AppState {
            store: db::connect_lazy(&config.store),
            store_path: config.store.path.clone(),
        };
        (dir, create_router(state, &config))
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (_dir, app) = missing_store_app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["endpoints"].get("/health").is_some());
    }

    #[tokio::test]
    async fn test_health_without_store_warns() {
        let (_dir, app) = missing_store_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["database"], "not found");
        assert!(json["database_path"].as_str().unwrap().ends_with("ruc.sqlite"));
    }
}
