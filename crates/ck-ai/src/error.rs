//! Upstream error types.

use thiserror::Error;

/// Result type for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Errors from the completion and image APIs.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("Upstream returned {0}: {1}")]
    Status(u16, String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl UpstreamError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited(body.into()),
            _ => Self::Status(status, body.into()),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Status code reported by upstream, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::RateLimited(_) => Some(429),
            Self::Status(status, _) => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
