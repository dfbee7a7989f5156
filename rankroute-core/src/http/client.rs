//! HTTP client implementation using reqwest

use crate::config::ConnectionConfig;
use crate::http::error::map_http_error;
use crate::http::RequestOptions;
use crate::providers::error::ProviderError;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Shared HTTP client with connection pooling
#[derive(Clone, Debug)]
pub struct HttpClient {
    /// The underlying reqwest client; cloning shares the pool
    client: Client,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_config(&ConnectionConfig::default())
    }

    /// Create a new HTTP client from connection settings
    pub fn with_config(settings: &ConnectionConfig) -> Result<Self, ProviderError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(settings.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(settings.keepalive_secs))
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .user_agent(settings.user_agent.as_str())
            .gzip(true)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Validate response content type
    fn validate_content_type(response: &Response) -> Result<(), ProviderError> {
        if let Some(content_type) = response.headers().get("content-type") {
            let content_type_str = content_type.to_str().unwrap_or("").to_lowercase();

            if !content_type_str.contains("application/json") {
                return Err(ProviderError::ParseError(format!(
                    "Expected application/json, got: {}",
                    content_type_str
                )));
            }
        }

        Ok(())
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> Result<(), ProviderError> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(ProviderError::Other(format!(
                    "Response size {} exceeds maximum {}",
                    content_length, self.max_response_size
                )));
            }
        }

        Ok(())
    }

    /// POST a JSON body with bearer authentication and decode a JSON answer
    pub async fn post_json<Req, Resp>(
        &self,
        url: &str,
        api_key: &str,
        headers: &BTreeMap<String, String>,
        body: &Req,
        options: &RequestOptions,
    ) -> Result<Resp, ProviderError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let request_id = options.request_id;
        debug!(%url, %request_id, "Sending HTTP request");

        let mut req_builder = self
            .client
            .post(url)
            .timeout(options.timeout)
            .bearer_auth(api_key)
            .header("X-Request-ID", request_id.to_string())
            .json(body);

        for (key, value) in headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(%url, %request_id, "Request timed out");
                ProviderError::Timeout(options.timeout.as_secs())
            } else if e.is_connect() {
                error!(%url, %request_id, error = %e, "Connection error");
                ProviderError::Network(format!(
                    "Connection failed: {} [request_id: {}]",
                    e, request_id
                ))
            } else {
                error!(%url, %request_id, error = %e, "Request error");
                ProviderError::Network(format!("{} [request_id: {}]", e, request_id))
            }
        })?;

        let status = response.status();
        debug!(%status, %request_id, "Response status");

        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.ok();

            warn!(%status, %url, %request_id, "Request failed");
            return Err(map_http_error(status, Some(&headers), body, request_id));
        }

        Self::validate_content_type(&response)?;
        self.check_content_length(&response)?;

        let response_text = response.text().await.map_err(|e| {
            ProviderError::Network(format!(
                "Failed to read response body: {} [request_id: {}]",
                e, request_id
            ))
        })?;

        if response_text.len() > self.max_response_size {
            return Err(ProviderError::Other(format!(
                "Response size {} exceeds maximum {} [request_id: {}]",
                response_text.len(),
                self.max_response_size,
                request_id
            )));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            error!(%url, %request_id, error = %e, "Failed to parse response");
            ProviderError::ParseError(format!(
                "Invalid response format: {} [request_id: {}]",
                e, request_id
            ))
        })
    }
}
