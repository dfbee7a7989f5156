//! HTTP layer shared by the OpenAI-compatible backends
//!
//! This module handles:
//! - Connection pooling and client management
//! - JSON request/response exchange
//! - Error mapping from status codes and bodies
//! - Request ID generation and correlation

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::map_http_error;

use std::time::Duration;
use uuid::Uuid;

/// Default user agent
pub const DEFAULT_USER_AGENT: &str = concat!("rankroute/", env!("CARGO_PKG_VERSION"));

/// Options for a single HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RequestOptions {
    /// Create request options with a fresh request ID
    pub fn new(timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout,
        }
    }
}
