//! Error types shared across the RUC workspace

use thiserror::Error;

/// Main error type for shared RUC code
#[derive(Error, Debug)]
pub enum RucError {
    #[error("Parse error: {0}")]
    Parse(String),
}
