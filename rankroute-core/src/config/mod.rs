//! Router configuration
//!
//! Loads a [`RouterConfig`] from YAML or JSON, interpolating `${VAR}`
//! environment references before parsing, and validates it.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{interpolate_env_vars, referenced_env_vars};
pub use error::{ConfigError, ConfigFormat, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ConnectionConfig, ProviderConfig, ProviderType, RouterConfig, RoutingConfig,
    SUPPORTED_VERSION,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;
use tracing::debug;

impl ConfigFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

/// Interpolate, deserialize and validate one document
fn parse(content: &str, format: ConfigFormat, origin: &str) -> ConfigResult<RouterConfig> {
    let content = env::interpolate_env_vars(content)?;

    let config: RouterConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| {
            let location = e.location();
            ConfigError::Parse {
                origin: origin.to_string(),
                format,
                line: location.as_ref().map(|l| l.line()),
                column: location.as_ref().map(|l| l.column()),
                message: e.to_string(),
            }
        })?,
        ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            format,
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?,
    };

    ConfigValidator::new().validate(&config)?;
    debug!(
        origin,
        providers = config.providers.len(),
        "Router configuration loaded"
    );
    Ok(config)
}

fn load_as(path: &Path, format: ConfigFormat) -> ConfigResult<RouterConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, format, &path.display().to_string())
}

/// Parse and validate a YAML configuration held in memory
pub fn from_yaml_str(content: &str) -> ConfigResult<RouterConfig> {
    parse(content, ConfigFormat::Yaml, "<inline>")
}

/// Parse and validate a JSON configuration held in memory
pub fn from_json_str(content: &str) -> ConfigResult<RouterConfig> {
    parse(content, ConfigFormat::Json, "<inline>")
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<RouterConfig> {
    load_as(path.as_ref(), ConfigFormat::Yaml)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<RouterConfig> {
    load_as(path.as_ref(), ConfigFormat::Json)
}

/// Load a configuration, choosing the format from the file extension
pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<RouterConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    load_as(path, format)
}
