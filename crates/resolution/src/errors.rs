//! Error types for a single resolver attempt
//!
//! None of these cross the engine boundary; they only decide whether the
//! chain falls through and what gets logged.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("offline registry is not loaded")]
    OfflineUnavailable,
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Transport(format!("request timed out: {err}"))
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}
