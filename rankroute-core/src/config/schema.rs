//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::http::DEFAULT_USER_AGENT;
use crate::providers::quota::QuotaLimits;
use crate::providers::routing::EmptyResponsePolicy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Schema version understood by this crate
pub const SUPPORTED_VERSION: &str = "0.1";

/// Root router configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Providers, in registration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Routing policy
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Shared HTTP connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// One OpenAI-compatible provider
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,

    /// Provider flavour
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// API key (supports environment variable interpolation)
    pub api_key: SecretString,

    /// Base URL; `/chat/completions` is appended
    pub base_url: String,

    /// Models tried in order
    #[serde(default)]
    pub models: Vec<String>,

    /// Priority for routing (higher = preferred)
    #[serde(default)]
    pub rank: i32,

    /// Request budgets, 0 = unlimited
    #[serde(default)]
    pub quota: QuotaLimits,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra headers sent with every request (e.g. HTTP-Referer, X-Title)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Whether this provider is registered with the router
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Supported provider flavours; all speak the chat-completions protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    OpenRouter,
    Custom,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::OpenRouter => "openrouter",
            ProviderType::Custom => "custom",
        }
    }
}

/// Routing policy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// What to do with an empty successful response
    #[serde(default)]
    pub empty_response: EmptyResponsePolicy,
}

/// Connection configuration shared by every HTTP backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
            keepalive_secs: default_keepalive(),
            user_agent: default_user_agent(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_timeout_ms() -> u64 { 30000 }
fn default_connect_timeout() -> u64 { 10000 }
fn default_request_timeout() -> u64 { 60000 }
fn default_max_idle() -> usize { 10 }
fn default_keepalive() -> u64 { 90 }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }

impl RouterConfig {
    /// Providers that will be registered with the router
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::missing("version"));
        }

        if self.version != SUPPORTED_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    expected: SUPPORTED_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        if self.providers.is_empty() {
            return Err(ValidationError::missing("providers")
                .with_context("At least one provider must be configured"));
        }

        let mut seen_names = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_names.insert(&provider.name) {
                return Err(ValidationError::duplicate(
                    format!("providers[{}].name", i),
                    provider.name.clone(),
                ));
            }

            provider.validate(&format!("providers[{}]", i))?;
        }

        if self.connection.connect_timeout_ms == 0 {
            return Err(ValidationError::not_positive("connection.connect_timeout_ms"));
        }

        if self.connection.request_timeout_ms == 0 {
            return Err(ValidationError::not_positive("connection.request_timeout_ms"));
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::missing(format!("{}.name", path)));
        }

        if self.api_key.is_empty() {
            return Err(ValidationError::missing(format!("{}.api_key", path)));
        }

        if self.base_url.is_empty() {
            return Err(ValidationError::missing(format!("{}.base_url", path)));
        }

        let url_path = format!("{}.base_url", path);
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| ValidationError::invalid_url(&url_path, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::invalid_url(
                url_path,
                format!("scheme must be http or https, got {}", url.scheme()),
            ));
        }

        if self.models.is_empty() {
            return Err(ValidationError::missing(format!("{}.models", path))
                .with_context("At least one model must be listed"));
        }

        for (i, model) in self.models.iter().enumerate() {
            if model.trim().is_empty() {
                return Err(ValidationError::missing(format!("{}.models[{}]", path, i)));
            }
        }

        if self.timeout_ms == 0 {
            return Err(ValidationError::not_positive(format!("{}.timeout_ms", path)));
        }

        Ok(())
    }
}
