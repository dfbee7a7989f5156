//! Protocol module for routed query structures
//!
//! This module defines the canonical data model shared by the router, the
//! tool relay and every provider backend.

pub mod types;

pub use types::{
    estimate_tokens, FileAttachment, FileKind, Message, MessageRole, QueryOptions, QueryResult,
    TokenUsage, ToolCall, ToolCallResult, ToolChoice, ToolDefinition,
};
