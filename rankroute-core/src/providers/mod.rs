//! Provider abstraction, quota tracking and rank-ordered routing
//!
//! Backends implement [`Provider`]. The [`Router`] tries them by descending
//! rank, skipping any whose request budget is exhausted, and aggregates the
//! failures when none answers.

pub mod adapter;
pub mod error;
mod factory;
pub mod openai_compat;
pub mod quota;
pub mod routing;
pub mod tool_relay;

pub use adapter::Provider;
pub use error::{ProviderError, ProviderResult};
pub use openai_compat::OpenAiCompatProvider;
pub use quota::{QuotaLimits, QuotaSnapshot, QuotaTracker};
pub use routing::{EmptyResponsePolicy, FailureCause, ProviderFailure, Router, RouterError};
pub use tool_relay::{ToolError, ToolExecutor, ToolRelay};
