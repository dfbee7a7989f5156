//! Provider error types

use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors a provider can raise from `send` or `close`.
///
/// The router treats every variant the same way: record it and move on to
/// the next provider. The variants exist for diagnostics only.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    /// 401 or 403
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote side throttled us (429)
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The body could not be decoded, or held no usable choice
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Account out of credit (402)
    #[error("Insufficient quota: {0}")]
    InsufficientQuota(String),

    #[error("Service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    /// The backend was built with unusable settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend answered with neither content nor tool calls
    #[error("Empty response from model '{model}'")]
    EmptyResponse { model: String },

    /// The request was cancelled before the provider answered
    #[error("Request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Server-suggested back-off, if the provider sent one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimit {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }
}
