//! Common error types for the parcel loader

use thiserror::Error;

/// Common result type for parcel loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the parcel loader crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error for interchange documents
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (bad identifier, malformed document)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Feature source failure (network, remote service error)
    #[error("Feature source error: {0}")]
    Source(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
