//! Ingest error type

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Corrupt archive {path}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No rows merged from {files_scanned} flat file(s) under {root}")]
    NoRowsMerged { root: PathBuf, files_scanned: usize },

    #[error("Dataset {path} has {lines} non-empty line(s), need a header and at least one row")]
    InsufficientLines { path: PathBuf, lines: usize },

    #[error("Store load into {path} failed: {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    /// Whether the pipeline can continue past this error for a single item.
    ///
    /// Network failures, bad links and corrupt archives only lose one file.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            IngestError::Http(_)
                | IngestError::Status { .. }
                | IngestError::InvalidUrl { .. }
                | IngestError::CorruptArchive { .. }
        )
    }
}

impl From<tempfile::PersistError> for IngestError {
    fn from(err: tempfile::PersistError) -> Self {
        IngestError::Io(err.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_errors() {
        let corrupt = IngestError::CorruptArchive {
            path: PathBuf::from("a.zip"),
            reason: "bad header".to_string(),
        };
        assert!(corrupt.is_skippable());

        let structural = IngestError::NoRowsMerged {
            root: PathBuf::from("downloads"),
            files_scanned: 0,
        };
        assert!(!structural.is_skippable());
    }

    #[test]
    fn test_load_failed_keeps_source() {
        let err = IngestError::LoadFailed {
            path: PathBuf::from("ruc.sqlite"),
            source: Box::new(IngestError::Config("disk full".to_string())),
        };
        assert!(err.to_string().contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
