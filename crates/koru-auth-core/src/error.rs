//! Error types for authorization resolution

use thiserror::Error;

/// Failure of a single authorization attempt, or of a whole resolution once
/// retries are exhausted.
///
/// Every variant is retryable from the resolver's point of view.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network failure talking to the platform (connect, timeout, body read)
    #[error("Authorization request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Platform answered with a non-2xx status
    #[error("Authorization failed: {status} {status_text}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status
        status_text: String,
    },

    /// 2xx response whose body is not a valid authorization response
    #[error("Invalid authorization response: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl AuthError {
    /// HTTP status carried by the error, if the platform answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Status { status, .. } => Some(*status),
            AuthError::Transport(e) => e.status().map(|s| s.as_u16()),
            AuthError::Protocol(_) => None,
        }
    }
}

/// Failure of the underlying key-value medium.
///
/// Never leaves the cache store; it is logged and read as a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Authorization state was requested from a scope with no mounted provider.
///
/// This is an integration mistake, not a runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Authorization state requested outside a mounted provider (scope {scope})")]
pub struct UsageError {
    pub scope: u64,
}
