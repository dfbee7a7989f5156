//! Configuration validation utilities

use super::env::ENV_VAR_PATTERN;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::RouterConfig;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::warn;

/// Configuration validator with rules beyond the per-field checks
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &RouterConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_enabled(config)?;
        self.validate_headers(config)?;
        self.validate_placeholders(config)?;
        self.warn_on_shadowed_ranks(config);

        Ok(())
    }

    fn validate_enabled(&self, config: &RouterConfig) -> Result<(), ValidationError> {
        if config.enabled_providers().next().is_none() {
            return Err(ValidationError::missing("providers")
                .with_context("At least one provider must be enabled"));
        }
        Ok(())
    }

    /// Extra headers must be sendable as-is
    fn validate_headers(&self, config: &RouterConfig) -> Result<(), ValidationError> {
        for (i, provider) in config.providers.iter().enumerate() {
            for (name, value) in &provider.headers {
                let path = format!("providers[{}].headers.{}", i, name);
                if HeaderName::from_bytes(name.as_bytes()).is_err() {
                    return Err(ValidationError::invalid_value(path, "HTTP header name", name));
                }
                if HeaderValue::from_str(value).is_err() {
                    return Err(ValidationError::invalid_value(
                        path,
                        "visible ASCII header value",
                        value,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Placeholders left after interpolation mean a config was built by hand
    fn validate_placeholders(&self, config: &RouterConfig) -> Result<(), ValidationError> {
        for (i, provider) in config.providers.iter().enumerate() {
            if ENV_VAR_PATTERN.is_match(provider.api_key.expose_secret()) {
                return Err(ValidationError::new(
                    format!("providers[{}].api_key", i),
                    ValidationErrorKind::InvalidValue {
                        expected: "resolved API key".to_string(),
                        actual: "unresolved ${...} placeholder".to_string(),
                    },
                ));
            }
        }
        Ok(())
    }

    fn warn_on_shadowed_ranks(&self, config: &RouterConfig) {
        let enabled: Vec<_> = config.enabled_providers().collect();
        for (i, a) in enabled.iter().enumerate() {
            for b in &enabled[i + 1..] {
                if a.rank == b.rank {
                    warn!(
                        first = %a.name,
                        second = %b.name,
                        rank = a.rank,
                        "Providers share a rank; registration order decides"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> RouterConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_all_disabled_rejected() {
        let cfg = config(
            r#"
version: "0.1"
providers:
  - name: a
    type: openai
    api_key: sk-aaaaaaaaaaaa
    base_url: https://api.openai.com/v1
    models: [gpt-4o-mini]
    enabled: false
"#,
        );
        let err = ConfigValidator::new().validate(&cfg).unwrap_err();
        assert_eq!(err.field_path, "providers");
    }

    #[test]
    fn test_bad_header_rejected() {
        let cfg = config(
            r#"
version: "0.1"
providers:
  - name: a
    type: openrouter
    api_key: sk-aaaaaaaaaaaa
    base_url: https://openrouter.ai/api/v1
    models: [openai/gpt-4o-mini]
    headers:
      "bad header": x
"#,
        );
        let err = ConfigValidator::new().validate(&cfg).unwrap_err();
        assert_eq!(err.field_path, "providers[0].headers.bad header");
    }

    #[test]
    fn test_unresolved_placeholder_rejected() {
        let cfg = config(
            r#"
version: "0.1"
providers:
  - name: a
    type: custom
    api_key: ${NOT_INTERPOLATED}
    base_url: http://localhost:8080/v1
    models: [local]
"#,
        );
        let err = ConfigValidator::new().validate(&cfg).unwrap_err();
        assert_eq!(err.field_path, "providers[0].api_key");
    }
}
