//! Error types for snagboard-kv operations.

use std::io;
use thiserror::Error;

/// The error type for snagboard-kv operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading or writing a slot.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error for a typed slot payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for snagboard-kv operations.
pub type Result<T> = std::result::Result<T, Error>;
