//! Router-level tests against a store built by the ingest loader.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use ruc_ingest::loader::StoreLoader;
use ruc_server::{
    api::{create_router, AppState},
    config::Config,
    db,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const HEADER: &str = "RUC|RAZON_SOCIAL|DV|RUC_ANTERIOR|ESTADO";

async fn app_with_rows(rows: &[&str]) -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let dataset = dir.path().join("ruc.csv");
    let store = dir.path().join("ruc.sqlite");

    let mut contents = String::from(HEADER);
    for row in rows {
        contents.push('\n');
        contents.push_str(row);
    }
    contents.push('\n');
    std::fs::write(&dataset, contents).unwrap();

    StoreLoader::new(1000, 10).load(&dataset, &store).await.unwrap();

    (dir, app_for(store))
}

fn app_for(store: std::path::PathBuf) -> Router {
    let mut config = Config::default();
    config.store.path = store;
    let state = AppState {
        store: db::connect_lazy(&config.store),
        store_path: config.store.path.clone(),
    };
    create_router(state, &config)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_lookup_formats_check_digit() {
    let (_dir, app) = app_with_rows(&["123|Empresa|4||ACTIVO"]).await;

    let (status, body) = get(app, "/api/v1/ruc/123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ruc"], "123-4");
    assert_eq!(body["data"]["razon_social"], "Empresa");
    assert_eq!(body["data"]["estado"], "ACTIVO");
}

#[tokio::test]
async fn test_lookup_missing_key_is_404() {
    let (_dir, app) = app_with_rows(&["123|Empresa|4||ACTIVO"]).await;

    let (status, body) = get(app, "/api/v1/ruc/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_search_prefers_exact_key() {
    let (_dir, app) = app_with_rows(&[
        "123|Empresa|4||ACTIVO",
        "555|Comercial 123 S.A.|1||ACTIVO",
    ])
    .await;

    let (status, body) = get(app, "/api/v1/search?query=123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["match_type"], "exact");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["ruc"], "123-4");
    assert_eq!(body["meta"]["match_type"], "exact");
}

#[tokio::test]
async fn test_search_by_name_respects_limit() {
    let rows: Vec<String> = (0..15)
        .map(|i| format!("{}|  Ferreteria {}  |{}||ACTIVO", 1000 + i, i, i % 10))
        .collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let (_dir, app) = app_with_rows(&refs).await;

    let (status, body) = get(app.clone(), "/api/v1/search?query=ferreteria").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["match_type"], "name");
    assert_eq!(body["data"]["total"], 10);
    assert!(body["data"]["results"][0]["razon_social"]
        .as_str()
        .unwrap()
        .starts_with("Ferreteria"));

    let (status, body) = get(app, "/api/v1/search?query=ferreteria&limit=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_search_validation() {
    let (_dir, app) = app_with_rows(&["123|Empresa|4||ACTIVO"]).await;

    for uri in [
        "/api/v1/search",
        "/api/v1/search?query=",
        "/api/v1/search?query=Empresa&limit=0",
        "/api/v1/search?query=Empresa&limit=101",
        "/api/v1/search?query=Empresa&limit=abc",
    ] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false, "{}", uri);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{}", uri);
    }
}

#[tokio::test]
async fn test_search_without_matches_is_404() {
    let (_dir, app) = app_with_rows(&["123|Empresa|4||ACTIVO"]).await;

    let (status, _) = get(app, "/api/v1/search?query=inexistente").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_store_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let app = app_for(dir.path().join("ruc.sqlite"));

    let (status, body) = get(app.clone(), "/api/v1/ruc/123").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "warning");
    assert_eq!(body["database"], "not found");
}

#[tokio::test]
async fn test_health_with_store() {
    let (_dir, app) = app_with_rows(&["123|Empresa|4||ACTIVO"]).await;

    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}
