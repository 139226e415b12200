//! Error types for the review engine.

use thiserror::Error;

/// Everything that can go wrong while scheduling, bootstrapping or grading.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Quality rating outside 0-5
    #[error("invalid quality {0}: expected an integer in 0..=5")]
    InvalidQuality(i64),

    /// Session batch size must be positive
    #[error("invalid limit {0}: expected a positive batch size")]
    InvalidLimit(i64),

    /// No vocabulary exists to seed cards from
    #[error("vocabulary pool is empty, add words before reviewing")]
    EmptyPool,

    /// Another call is already in flight on this session
    #[error("session is busy with another call")]
    SessionBusy,

    /// Card store I/O failed; the session is unchanged and the call may be retried
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Card id unknown to the session queue or the store
    #[error("card not found: {0}")]
    NotFound(String),

    /// Operation not valid in the current session status
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Session was cancelled while the call was in flight
    #[error("session was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReviewError {
    /// Only store failures can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::PersistenceError(_))
    }
}

impl From<rusqlite::Error> for ReviewError {
    fn from(err: rusqlite::Error) -> Self {
        ReviewError::PersistenceError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ReviewError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReviewError::PersistenceError(format!("store task failed: {}", err))
    }
}

/// Result alias for review engine operations
pub type Result<T> = std::result::Result<T, ReviewError>;
