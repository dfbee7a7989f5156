//! Tool-call relay
//!
//! [`ToolRelay`] wraps any [`Provider`] and resolves tool calls in the
//! provider's answer through a caller-supplied [`ToolExecutor`]. Execution is
//! best-effort: a failing call is logged and dropped. If at least one call
//! produced a result, the relay sends the conversation back to the same
//! model once with the results appended and returns that second answer.
//! Only one round-trip is performed per attempt. The first request is
//! charged to the inner provider's quota before the follow-up goes out.

use crate::protocol::{Message, QueryOptions, QueryResult, ToolCall, ToolCallResult, ToolDefinition};
use crate::providers::adapter::Provider;
use crate::providers::error::ProviderResult;
use crate::providers::quota::QuotaTracker;
use crate::providers::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors raised while executing a single tool call
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// No tool with this name is registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// An argument was missing or malformed
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// The tool ran and failed
    #[error("Tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },

    /// Execution was cancelled
    #[error("Tool execution cancelled")]
    Cancelled,
}

impl ToolError {
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Executes tool calls on behalf of the model
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run one tool call
    async fn execute_tool(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult, ToolError>;

    /// Tools offered to the model when the caller supplies none
    fn available_tools(&self) -> Vec<ToolDefinition>;
}

/// Provider decorator that resolves one round of tool calls
pub struct ToolRelay<P> {
    inner: P,
    executor: Arc<dyn ToolExecutor>,
}

impl<P: Provider> ToolRelay<P> {
    pub fn new(inner: P, executor: Arc<dyn ToolExecutor>) -> Self {
        Self { inner, executor }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Run every call, keeping only successful results
    async fn execute_all(
        &self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> ProviderResult<(Vec<ToolCall>, Vec<ToolCallResult>)> {
        let mut answered = Vec::with_capacity(calls.len());
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            match self.executor.execute_tool(call, cancel).await {
                Ok(result) => {
                    debug!(
                        provider = self.inner.name(),
                        tool = %call.function_name,
                        call_id = %call.id,
                        "Tool call executed"
                    );
                    answered.push(call.clone());
                    results.push(result);
                }
                Err(ToolError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(err) => {
                    warn!(
                        provider = self.inner.name(),
                        tool = %call.function_name,
                        call_id = %call.id,
                        error = %err,
                        "Tool call failed, dropping it"
                    );
                }
            }
        }

        Ok((answered, results))
    }
}

#[async_trait]
impl<P: Provider> Provider for ToolRelay<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn rank(&self) -> i32 {
        self.inner.rank()
    }

    fn quota(&self) -> &QuotaTracker {
        self.inner.quota()
    }

    async fn send(
        &self,
        messages: &[Message],
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> ProviderResult<QueryResult> {
        let mut options = options.clone();
        if options.tools.is_empty() {
            options.tools = self.executor.available_tools();
        }

        let first = self.inner.send(messages, &options, cancel).await?;
        if !first.has_tool_calls() {
            return Ok(first);
        }

        let (answered, results) = self.execute_all(&first.tool_calls, cancel).await?;
        if results.is_empty() {
            debug!(
                provider = self.inner.name(),
                calls = first.tool_calls.len(),
                "No tool call produced a result, returning the first response"
            );
            return Ok(first);
        }

        // The first round-trip hit the backend too. The caller charges only
        // the answer it finally receives.
        self.inner.quota().record_usage(first.tokens_used(messages));

        let mut follow_up = Vec::with_capacity(messages.len() + 1);
        follow_up.extend_from_slice(messages);
        follow_up.push(Message::tool_results(answered, results));

        // Same model as the first answer.
        let options = options.with_force_model(first.model.clone());
        self.inner.send(&follow_up, &options, cancel).await
    }

    async fn close(&self) -> ProviderResult<()> {
        self.inner.close().await
    }

    fn can_serve_daily(&self) -> bool {
        self.inner.can_serve_daily()
    }

    fn can_serve_per_minute(&self) -> bool {
        self.inner.can_serve_per_minute()
    }

    fn can_serve_tokens(&self, estimated: u32) -> bool {
        self.inner.can_serve_tokens(estimated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageRole;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recording {
        quota: QuotaTracker,
        responses: Mutex<Vec<QueryResult>>,
        seen: Mutex<Vec<(Vec<Message>, QueryOptions)>>,
    }

    #[async_trait]
    impl Provider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn rank(&self) -> i32 {
            7
        }

        fn quota(&self) -> &QuotaTracker {
            &self.quota
        }

        async fn send(
            &self,
            messages: &[Message],
            options: &QueryOptions,
            _cancel: &CancellationToken,
        ) -> ProviderResult<QueryResult> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.clone()));
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        async fn execute_tool(
            &self,
            call: &ToolCall,
            _cancel: &CancellationToken,
        ) -> Result<ToolCallResult, ToolError> {
            Ok(ToolCallResult::new(&call.id, json!({"echo": call.function_name})))
        }

        fn available_tools(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition::new("echo", "Echo", json!({"type": "object"}))]
        }
    }

    #[tokio::test]
    async fn test_relay_preserves_identity_and_injects_tools() {
        let inner = Recording {
            quota: QuotaTracker::unlimited(),
            responses: Mutex::new(vec![QueryResult::new("plain", "m1")]),
            seen: Mutex::new(Vec::new()),
        };
        let relay = ToolRelay::new(inner, Arc::new(Echo));
        assert_eq!(relay.name(), "recording");
        assert_eq!(relay.rank(), 7);

        let result = relay
            .send(&[Message::user("hi")], &QueryOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.content, "plain");

        let seen = relay.inner().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1.tools[0].name, "echo");
    }

    #[tokio::test]
    async fn test_follow_up_targets_same_model() {
        let call = ToolCall::new("call_1", "echo", serde_json::Map::new());
        let inner = Recording {
            quota: QuotaTracker::unlimited(),
            responses: Mutex::new(vec![
                QueryResult::new("", "m2").with_tool_calls(vec![call]),
                QueryResult::new("done", "m2"),
            ]),
            seen: Mutex::new(Vec::new()),
        };
        let relay = ToolRelay::new(inner, Arc::new(Echo));

        let result = relay
            .send(&[Message::user("hi")], &QueryOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.content, "done");

        let seen = relay.inner().seen.lock().unwrap();
        let (messages, options) = &seen[1];
        assert_eq!(options.force_model.as_deref(), Some("m2"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Tool);
        assert_eq!(messages[1].tool_results[0].id, "call_1");
        assert_eq!(relay.quota().snapshot().requests_today, 1);
    }
}
