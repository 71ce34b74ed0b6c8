//! Error types for the claim store

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request could not complete (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The device answered but reported a failure.
    #[error("rejected by device: {0}")]
    Rejected(String),

    /// The device answered with something other than the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
