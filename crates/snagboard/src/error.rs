//! Error types for snagboard operations.

use crate::domain::IssueId;
use std::io;
use thiserror::Error;

/// The error type for snagboard operations.
///
/// Benign upvote no-ops (the identity already matches the requested end
/// state) are not errors; those surface as `Ok(false)` from the upvote
/// operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A mutation requiring an authenticated identity was attempted without
    /// one. Raised before any backend call; nothing is partially applied.
    #[error("not authenticated")]
    Unauthenticated,

    /// The mutation target id is unknown to the backend.
    #[error("issue not found: {0}")]
    IssueNotFound(IssueId),

    /// The backend is misconfigured or unreachable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend-specific storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error from the persistence substrate.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<snagboard_kv::Error> for Error {
    fn from(e: snagboard_kv::Error) -> Self {
        match e {
            snagboard_kv::Error::Io(io_err) => Error::Io(io_err),
            snagboard_kv::Error::Json(json_err) => Error::Json(json_err),
        }
    }
}

/// A specialized Result type for snagboard operations.
pub type Result<T> = std::result::Result<T, Error>;
