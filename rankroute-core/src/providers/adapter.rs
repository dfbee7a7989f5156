//! Provider adapter trait
//!
//! Defines the capability every backend exposes to the router. Concrete
//! backends translate the canonical protocol into their own wire format;
//! the router only sees this trait.

use crate::protocol::{Message, QueryOptions, QueryResult};
use crate::providers::error::ProviderResult;
use crate::providers::quota::QuotaTracker;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Core provider trait that all LLM backends must implement
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider's name. An empty name is replaced by a positional
    /// placeholder when the provider is registered with a router.
    fn name(&self) -> &str;

    /// Priority rank; higher ranks are tried first
    fn rank(&self) -> i32;

    /// The quota tracker owned by this provider
    fn quota(&self) -> &QuotaTracker;

    /// Send messages and wait for the answer.
    ///
    /// Implementations should stop work and return
    /// [`ProviderError::Cancelled`](crate::providers::ProviderError::Cancelled)
    /// once `cancel` fires.
    async fn send(
        &self,
        messages: &[Message],
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> ProviderResult<QueryResult>;

    /// Release any held resources
    async fn close(&self) -> ProviderResult<()> {
        Ok(())
    }

    /// Whether the daily request budget has room
    fn can_serve_daily(&self) -> bool {
        self.quota().can_serve_daily()
    }

    /// Whether the per-minute request budget has room
    fn can_serve_per_minute(&self) -> bool {
        self.quota().can_serve_per_minute()
    }

    /// Whether `estimated` more tokens fit in the current minute
    fn can_serve_tokens(&self, estimated: u32) -> bool {
        self.quota().can_serve_tokens(estimated)
    }
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn rank(&self) -> i32 {
        (**self).rank()
    }

    fn quota(&self) -> &QuotaTracker {
        (**self).quota()
    }

    async fn send(
        &self,
        messages: &[Message],
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> ProviderResult<QueryResult> {
        (**self).send(messages, options, cancel).await
    }

    async fn close(&self) -> ProviderResult<()> {
        (**self).close().await
    }

    fn can_serve_daily(&self) -> bool {
        (**self).can_serve_daily()
    }

    fn can_serve_per_minute(&self) -> bool {
        (**self).can_serve_per_minute()
    }

    fn can_serve_tokens(&self, estimated: u32) -> bool {
        (**self).can_serve_tokens(estimated)
    }
}
