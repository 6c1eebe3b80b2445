//! RUC Lookup Server Library
//!
//! Read-only HTTP API over the SQLite store produced by `ruc-ingest`.
//!
//! # Overview
//!
//! - **Lookup**: exact search by RUC and combined key/business-name search
//! - **Store**: lazily connected, read-only SQLx pool; the server starts
//!   before the first ingestion run and reports the store as missing
//! - **Configuration**: environment-based, see [`config::Config`]
//! - **Middleware**: CORS, compression and request tracing
//!
//! # Architecture
//!
//! Features are vertical slices under [`features`]. Each query is a plain
//! struct with a `validate` method and an async `handle(pool, query)`
//! function returning a feature-specific error that routes map to HTTP
//! status codes.
//!
//! # Example
//!
//! ```no_run
//! use ruc_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let state = api::AppState {
//!         store: db::connect_lazy(&config.store),
//!         store_path: config.store.path.clone(),
//!     };
//!     let app = api::create_router(state, &config);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
pub use features::lookup::LookupRecord;
