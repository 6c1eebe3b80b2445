//! RUC ingest library
//!
//! Builds the RUC taxpayer registry store from the archives published on a
//! listing page.
//!
//! # Stages
//!
//! - [`discovery`]: find `.zip` links on the listing page
//! - [`fetcher`]: download each archive
//! - [`extractor`]: unpack it next to itself and delete it
//! - [`unifier`]: merge all extracted `*.txt` files into one dataset
//! - [`validator`]: quarantine rows with the wrong column count
//! - [`loader`]: rebuild the SQLite store from the dataset
//!
//! [`pipeline::IngestPipeline`] runs them in order.
//!
//! # Example
//!
//! ```no_run
//! use ruc_ingest::{IngestConfig, IngestPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load(None)?;
//!     let report = IngestPipeline::new(config)?
//!         .run("https://example.com/listado-ruc")
//!         .await?;
//!     println!("{} rows loaded", report.rows_loaded);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod loader;
pub mod pipeline;
pub mod unifier;
pub mod validator;

pub use config::{HeaderPolicy, IngestConfig};
pub use error::{IngestError, Result};
pub use fetcher::FetchedArchive;
pub use pipeline::{IngestPipeline, PipelineReport};
