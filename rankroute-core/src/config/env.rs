//! Environment variable interpolation for configuration

use super::error::ConfigError;
use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

/// `${VAR}` placeholders; names are upper-case identifiers
pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Replace every `${VAR}` in `content` with the variable's value.
///
/// Fails with the first variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &Captures<'_>| {
        let var_name = &cap[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::MissingEnvVar { var }),
        None => Ok(result.into_owned()),
    }
}

/// Names of all variables referenced in `text`, in order of appearance
pub fn referenced_env_vars(text: &str) -> Vec<String> {
    ENV_VAR_PATTERN
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}
