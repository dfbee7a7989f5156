//! Building a router from configuration

use crate::config::{ConfigError, ConfigValidator, RouterConfig};
use crate::http::HttpClient;
use crate::providers::adapter::Provider;
use crate::providers::openai_compat::OpenAiCompatProvider;
use crate::providers::routing::Router;
use crate::providers::tool_relay::{ToolExecutor, ToolRelay};
use std::sync::Arc;
use tracing::{debug, info};

impl Router {
    /// Build a router with one backend per enabled provider.
    ///
    /// When `executor` is given every backend is wrapped in a [`ToolRelay`]
    /// sharing it. All backends share one connection pool.
    pub fn from_config(
        config: &RouterConfig,
        executor: Option<Arc<dyn ToolExecutor>>,
    ) -> Result<Self, ConfigError> {
        ConfigValidator::new().validate(config)?;

        let http = HttpClient::with_config(&config.connection)
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let providers: Vec<Box<dyn Provider>> = config
            .enabled_providers()
            .map(|provider_config| {
                debug!(
                    provider = %provider_config.name,
                    kind = provider_config.provider_type.as_str(),
                    rank = provider_config.rank,
                    models = provider_config.models.len(),
                    key = %provider_config.api_key.hint(),
                    "Registering provider"
                );
                let backend = OpenAiCompatProvider::new(provider_config, http.clone());
                match &executor {
                    Some(executor) => {
                        Box::new(ToolRelay::new(backend, Arc::clone(executor))) as Box<dyn Provider>
                    }
                    None => Box::new(backend) as Box<dyn Provider>,
                }
            })
            .collect();

        let router = Router::new(providers)?
            .with_empty_response_policy(config.routing.empty_response);

        info!(
            providers = ?router.providers(),
            tools = executor.is_some(),
            "Router built from configuration"
        );
        Ok(router)
    }
}
