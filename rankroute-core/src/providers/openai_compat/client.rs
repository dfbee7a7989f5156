//! OpenAI-compatible chat-completions provider

use super::converter::{from_response, to_request};
use super::types::ChatCompletionResponse;
use crate::config::{ProviderConfig, SecretString};
use crate::http::{HttpClient, RequestOptions};
use crate::protocol::{Message, QueryOptions, QueryResult};
use crate::providers::adapter::Provider;
use crate::providers::error::{ProviderError, ProviderResult};
use crate::providers::quota::QuotaTracker;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Provider speaking the chat-completions protocol (OpenAI, OpenRouter, gateways)
pub struct OpenAiCompatProvider {
    name: String,
    rank: i32,
    api_key: SecretString,
    endpoint: String,
    models: Vec<String>,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    quota: QuotaTracker,
    http: HttpClient,
}

impl fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("rank", &self.rank)
            .field("endpoint", &self.endpoint)
            .field("models", &self.models)
            .field("api_key", &self.api_key)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Build a provider from its configuration and a shared HTTP client
    pub fn new(config: &ProviderConfig, http: HttpClient) -> Self {
        Self {
            name: config.name.clone(),
            rank: config.rank,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            models: config.models.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            headers: config.headers.clone(),
            quota: QuotaTracker::new(config.quota),
            http,
        }
    }

    /// Full chat-completions URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    async fn send_to_model(
        &self,
        model: &str,
        messages: &[Message],
        options: &QueryOptions,
    ) -> ProviderResult<QueryResult> {
        let request = to_request(model, messages, options);
        let request_options = RequestOptions::new(self.timeout);

        debug!(
            provider = %self.name,
            model,
            request_id = %request_options.request_id,
            messages = request.messages.len(),
            "Sending chat completion"
        );

        let response: ChatCompletionResponse = self
            .http
            .post_json(
                &self.endpoint,
                self.api_key.expose_secret(),
                &self.headers,
                &request,
                &request_options,
            )
            .await?;

        from_response(response, model)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn rank(&self) -> i32 {
        self.rank
    }

    fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    async fn send(
        &self,
        messages: &[Message],
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> ProviderResult<QueryResult> {
        let models: Vec<&str> = match &options.force_model {
            Some(model) => vec![model.as_str()],
            None => self.models.iter().map(String::as_str).collect(),
        };

        if models.is_empty() {
            return Err(ProviderError::Configuration(format!(
                "provider '{}' has no models configured",
                self.name
            )));
        }

        let mut last_error = None;
        for model in models {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                result = self.send_to_model(model, messages, options) => result,
            };

            match attempt {
                Ok(result) => return Ok(result),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    warn!(provider = %self.name, model, error = %err, "Model attempt failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::Other(format!("provider '{}' made no attempts", self.name))
        }))
    }
}
