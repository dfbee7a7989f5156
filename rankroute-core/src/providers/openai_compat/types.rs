//! Chat-completions wire types
//!
//! These types match the OpenAI chat-completions format spoken by OpenAI,
//! OpenRouter and most self-hosted gateways.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

/// A message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<WireContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Message content: a plain string or an array of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<WireContentPart>),
}

/// Content part for multimodal messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireContentPart {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image_url")]
    ImageUrl { image_url: WireImageUrl },
}

/// Image reference, usually a base64 data URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireImageUrl {
    pub url: String,
}

/// Function call with JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,

    #[serde(default)]
    pub arguments: String,
}

/// Tool call as sent and received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String,

    pub function: WireFunctionCall,
}

/// Tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: String,

    pub function: WireFunction,
}

/// Function definition inside a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,

    pub parameters: Value,
}

pub(crate) fn function_type() -> String {
    "function".to_string()
}

/// Chat completion response. Fields other than `choices` are optional
/// because gateways differ in what they echo back.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub choices: Vec<WireChoice>,

    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// One choice in a response
#[derive(Debug, Deserialize)]
pub struct WireChoice {
    pub message: WireResponseMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message inside a choice
#[derive(Debug, Default, Deserialize)]
pub struct WireResponseMessage {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

/// Usage information
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}
