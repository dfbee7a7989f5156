//! Errors raised while loading a router configuration

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Serialization format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        })
    }
}

/// Anything that stops a configuration from becoming a router
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read router config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {format} in {origin}{}: {message}", location(.line, .column))]
    Parse {
        origin: String,
        format: ConfigFormat,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A `${VAR}` reference named a variable that is not set
    #[error("environment variable '{var}' is referenced but not set")]
    MissingEnvVar { var: String },

    #[error("unsupported config file '{}': expected .yaml, .yml or .json", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The shared connection pool could not be built
    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),

    /// A router needs at least one provider
    #[error("no providers configured")]
    NoProviders,
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at {}:{}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A single rejected field, addressed by its path (e.g. `providers[0].api_key`)
#[derive(Debug, Error)]
#[error("invalid config at '{field_path}': {kind}{}", note(.context))]
pub struct ValidationError {
    pub field_path: String,
    pub kind: ValidationErrorKind,
    pub context: Option<String>,
}

fn note(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("required field is missing")]
    Missing,

    #[error("expected {expected}, got {actual}")]
    InvalidValue { expected: String, actual: String },

    #[error("must be greater than 0")]
    NotPositive,

    #[error("'{value}' appears more than once")]
    Duplicate { value: String },

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("unsupported schema version {actual} (this build reads {expected})")]
    UnsupportedVersion { expected: String, actual: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn missing(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::Missing)
    }

    pub fn invalid_value(
        field_path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::InvalidValue {
                expected: expected.into(),
                actual: actual.into(),
            },
        )
    }

    pub fn not_positive(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::NotPositive)
    }

    pub fn duplicate(field_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::Duplicate {
                value: value.into(),
            },
        )
    }

    pub fn invalid_url(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::InvalidUrl {
                message: message.into(),
            },
        )
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_carries_path_and_note() {
        let err = ValidationError::missing("providers[2].models")
            .with_context("At least one model must be listed");
        assert_eq!(
            err.to_string(),
            "invalid config at 'providers[2].models': required field is missing \
             (At least one model must be listed)"
        );
    }

    #[test]
    fn test_parse_message_location() {
        let err = ConfigError::Parse {
            origin: "router.json".into(),
            format: ConfigFormat::Json,
            line: Some(3),
            column: Some(7),
            message: "expected value".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed JSON in router.json at 3:7: expected value"
        );
    }
}
