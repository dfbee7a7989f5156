//! Secret values in configuration
//!
//! API keys are wrapped in [`SecretString`] so they never appear in
//! `Debug`/`Display` output, including tracing fields.

use serde::{Deserialize, Serialize};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// An API key or similar credential
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for the one place that must send it
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Blank keys count as missing
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Enough of the key to tell two keys apart in logs.
    ///
    /// Keys of eight characters or fewer are fully hidden.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        match chars.len() {
            0 => "[EMPTY]".to_string(),
            n if n <= 8 => REDACTED.to_string(),
            n => {
                let keep = if self.0.starts_with("sk-") { 3 } else { 2 };
                let head: String = chars[..keep].iter().collect();
                let tail: String = chars[n - 4..].iter().collect();
                format!("{}...{}", head, tail)
            }
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
