//! Error types for BOMX

use thiserror::Error;

/// Result type alias for BOMX operations
pub type Result<T> = std::result::Result<T, BomxError>;

/// Main error type for BOMX
#[derive(Error, Debug)]
pub enum BomxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown artifact type: {0}")]
    UnknownArtifactType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),
}
