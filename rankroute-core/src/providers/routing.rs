//! Rank-ordered routing with quota-aware fallback
//!
//! The [`Router`] holds providers sorted by descending rank (ties keep their
//! registration order) and tries them one at a time. A provider without
//! remaining daily or per-minute requests is skipped; any error from a
//! provider moves on to the next one. The first success wins. When nothing
//! succeeds the caller receives a [`RouterError`] listing one
//! [`ProviderFailure`] per provider, in iteration order.

use crate::config::ConfigError;
use crate::protocol::{Message, QueryOptions, QueryResult};
use crate::providers::adapter::Provider;
use crate::providers::error::ProviderError;
use crate::providers::quota::QuotaSnapshot;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Why a single provider did not produce the answer
#[derive(Debug, Clone, Error)]
pub enum FailureCause {
    /// Skipped without being called: daily or per-minute budget exhausted
    #[error("no remaining requests")]
    NoRemainingRequests,

    /// The provider was called and failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// One provider's entry in an aggregated failure
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    /// Resolved provider name
    pub provider: String,

    /// What went wrong
    pub cause: FailureCause,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, cause: impl Into<FailureCause>) -> Self {
        Self {
            provider: provider.into(),
            cause: cause.into(),
        }
    }

    /// True when the provider was skipped for quota rather than called
    pub fn is_quota_skip(&self) -> bool {
        matches!(self.cause, FailureCause::NoRemainingRequests)
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.cause)
    }
}

fn render_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Composite error returned by the router
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// Every provider was skipped or failed
    #[error("all {} providers failed: {}", .failures.len(), render_failures(.failures))]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    /// The caller cancelled the request; no further providers were tried
    #[error(
        "request cancelled after {} provider attempt(s): {}",
        .failures.len(),
        render_failures(.failures)
    )]
    Cancelled { failures: Vec<ProviderFailure> },

    /// One or more providers failed to release their resources
    #[error("failed to close {} provider(s): {}", .failures.len(), render_failures(.failures))]
    CloseFailed { failures: Vec<ProviderFailure> },
}

impl RouterError {
    /// Per-provider failures, in iteration order
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed { failures }
            | Self::Cancelled { failures }
            | Self::CloseFailed { failures } => failures,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// What to do with a successful response that carries no content and no tool calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResponsePolicy {
    /// Treat it as a provider failure and try the next provider
    #[default]
    Fallback,
    /// Return it to the caller as-is
    Accept,
}

struct ProviderEntry {
    name: String,
    provider: Box<dyn Provider>,
}

/// Routes queries across providers by rank and quota availability
pub struct Router {
    entries: Vec<ProviderEntry>,
    empty_response: EmptyResponsePolicy,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("providers", &self.providers())
            .field("empty_response", &self.empty_response)
            .finish()
    }
}

impl Router {
    /// Create a router over the given providers.
    ///
    /// Fails with [`ConfigError::NoProviders`] when the list is empty.
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let mut taken: HashSet<String> = providers
            .iter()
            .filter(|p| !p.name().is_empty())
            .map(|p| p.name().to_string())
            .collect();

        let mut entries: Vec<ProviderEntry> = providers
            .into_iter()
            .enumerate()
            .map(|(index, provider)| {
                let name = if provider.name().is_empty() {
                    placeholder_name(index, &mut taken)
                } else {
                    provider.name().to_string()
                };
                ProviderEntry { name, provider }
            })
            .collect();

        // Stable: equal ranks keep registration order.
        entries.sort_by_key(|entry| Reverse(entry.provider.rank()));

        debug!(
            order = ?entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "Router constructed"
        );

        Ok(Self {
            entries,
            empty_response: EmptyResponsePolicy::default(),
        })
    }

    /// Set the policy for empty successful responses
    pub fn with_empty_response_policy(mut self, policy: EmptyResponsePolicy) -> Self {
        self.empty_response = policy;
        self
    }

    pub fn empty_response_policy(&self) -> EmptyResponsePolicy {
        self.empty_response
    }

    /// Provider names in iteration order
    pub fn providers(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Quota counters of every provider, in iteration order
    pub fn quota_snapshots(&self) -> Vec<(String, QuotaSnapshot)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.provider.quota().snapshot()))
            .collect()
    }

    /// True iff any provider still has daily capacity.
    ///
    /// Per-minute and token budgets are not consulted, so this is a hint
    /// rather than a guarantee that the next query succeeds.
    pub fn has_remaining_requests(&self) -> bool {
        self.entries.iter().any(|e| e.provider.can_serve_daily())
    }

    /// Route a query with no cancellation
    pub async fn query(
        &self,
        messages: &[Message],
        options: &QueryOptions,
    ) -> Result<QueryResult, RouterError> {
        self.query_with_cancellation(messages, options, &CancellationToken::new())
            .await
    }

    /// Route a query, stopping as soon as `cancel` fires
    #[instrument(
        name = "router.query",
        skip_all,
        fields(messages = messages.len(), providers = self.entries.len())
    )]
    pub async fn query_with_cancellation(
        &self,
        messages: &[Message],
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, RouterError> {
        // Providers see a private copy; attachment bytes are shared, not copied.
        let messages: Vec<Message> = messages.to_vec();
        let options = options.clone();
        let mut failures = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            if cancel.is_cancelled() {
                warn!(provider = %entry.name, "Request cancelled before provider attempt");
                return Err(RouterError::Cancelled { failures });
            }

            let provider = entry.provider.as_ref();

            // Held until the call settles; only a success keeps the slot.
            let Some(reservation) = provider.quota().try_reserve() else {
                warn!(provider = %entry.name, "Skipping provider: no remaining requests");
                failures.push(ProviderFailure::new(
                    &entry.name,
                    FailureCause::NoRemainingRequests,
                ));
                continue;
            };

            debug!(provider = %entry.name, rank = provider.rank(), "Trying provider");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = provider.send(&messages, &options, cancel) => Some(result),
            };

            match outcome {
                None => {
                    warn!(provider = %entry.name, "Request cancelled during provider attempt");
                    failures.push(ProviderFailure::new(&entry.name, ProviderError::Cancelled));
                    return Err(RouterError::Cancelled { failures });
                }
                Some(Ok(result)) => {
                    if result.is_empty() && self.empty_response == EmptyResponsePolicy::Fallback {
                        warn!(
                            provider = %entry.name,
                            model = %result.model,
                            "Provider returned an empty response, falling back"
                        );
                        failures.push(ProviderFailure::new(
                            &entry.name,
                            ProviderError::EmptyResponse {
                                model: result.model.clone(),
                            },
                        ));
                        continue;
                    }

                    reservation.commit(result.tokens_used(&messages));

                    info!(
                        provider = %entry.name,
                        model = %result.model,
                        skipped_or_failed = failures.len(),
                        "Query answered"
                    );
                    return Ok(result);
                }
                Some(Err(err)) => {
                    warn!(
                        provider = %entry.name,
                        error = %err,
                        retry_after = ?err.retry_after(),
                        "Provider failed"
                    );
                    failures.push(ProviderFailure::new(&entry.name, err));
                    if cancel.is_cancelled() {
                        return Err(RouterError::Cancelled { failures });
                    }
                }
            }
        }

        debug_assert_eq!(failures.len(), self.entries.len());
        Err(RouterError::AllProvidersFailed { failures })
    }

    /// Close every provider, continuing past failures
    pub async fn close(self) -> Result<(), RouterError> {
        let mut failures = Vec::new();

        for entry in self.entries {
            if let Err(err) = entry.provider.close().await {
                error!(provider = %entry.name, error = %err, "Failed to close provider");
                failures.push(ProviderFailure::new(entry.name, err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RouterError::CloseFailed { failures })
        }
    }
}

fn placeholder_name(index: usize, taken: &mut HashSet<String>) -> String {
    let mut candidate = format!("provider-{}", index + 1);
    let mut suffix = 1;
    while taken.contains(&candidate) {
        suffix += 1;
        candidate = format!("provider-{}-{}", index + 1, suffix);
    }
    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_names_are_unique() {
        let mut taken: HashSet<String> = ["provider-2".to_string()].into_iter().collect();
        assert_eq!(placeholder_name(0, &mut taken), "provider-1");
        assert_eq!(placeholder_name(1, &mut taken), "provider-2-2");
        assert!(taken.contains("provider-1"));
    }

    #[test]
    fn test_router_error_rendering() {
        let err = RouterError::AllProvidersFailed {
            failures: vec![
                ProviderFailure::new("gemini", FailureCause::NoRemainingRequests),
                ProviderFailure::new("openrouter", ProviderError::Timeout(30)),
            ],
        };
        assert_eq!(
            err.to_string(),
            "all 2 providers failed: gemini: no remaining requests; \
             openrouter: Request timed out after 30 seconds"
        );
        assert_eq!(err.failures().len(), 2);
        assert!(err.failures()[0].is_quota_skip());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_empty_response_policy_serde() {
        let policy: EmptyResponsePolicy = serde_json::from_str("\"accept\"").unwrap();
        assert_eq!(policy, EmptyResponsePolicy::Accept);
        assert_eq!(EmptyResponsePolicy::default(), EmptyResponsePolicy::Fallback);
    }
}
