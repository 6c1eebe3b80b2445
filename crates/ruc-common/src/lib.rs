//! RUC Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup and error handling for the RUC workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`RucError`] for shared parsing failures
//! - **Logging**: `tracing` subscriber configuration ([`logging`])
//! - **Types**: the dataset/store contract ([`types::StoreField`], [`types::FlatRecord`], ...)
//!
//! # Example
//!
//! ```no_run
//! use ruc_common::types::{FlatRecord, StoreRow};
//!
//! let record = FlatRecord::parse("80012345|EMPRESA S.A.|7||ACTIVO");
//! let row = StoreRow::from_record(&record);
//! assert_eq!(row.dv, "7");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::RucError;
