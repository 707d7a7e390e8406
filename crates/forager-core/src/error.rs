//! Unified error types for Forager

use thiserror::Error;

/// Unified error type for Forager glue-level operations.
///
/// Run-level failures never surface here: the kernel folds them into a
/// `not_computable` RunResult instead. This type covers the I/O and parsing
/// edges around the kernel (request files, config, ledger export).
#[derive(Error, Debug)]
pub enum ForagerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Request parse error: {0}")]
    RequestParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using ForagerError
pub type Result<T> = std::result::Result<T, ForagerError>;
