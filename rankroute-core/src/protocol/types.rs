//! Core protocol types for routed LLM queries
//!
//! These are the provider-agnostic structures the router hands to every
//! backend. Backends translate them into their own wire format; the router
//! itself only clones and forwards them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
    /// Tool results fed back to the model after a tool-call round-trip
    Tool,
}

impl MessageRole {
    /// Returns the wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Broad category of an attached file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
    Audio,
}

impl FileKind {
    /// Returns the wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
        }
    }

    /// Infer the kind from a MIME type
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            Self::Image
        } else if mime_type.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Document
        }
    }
}

/// A file attached to a message.
///
/// Attachments are immutable once constructed. The payload is reference
/// counted, so cloning a message (which the router does before every
/// dispatch) never copies file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    kind: FileKind,
    mime_type: String,
    name: String,
    data: Arc<[u8]>,
}

impl FileAttachment {
    /// Create an attachment from raw bytes
    pub fn new(
        kind: FileKind,
        mime_type: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            kind,
            mime_type: mime_type.into(),
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read an attachment from disk, inferring MIME type and kind from the extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;

        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(mime_type_for_extension)
            .unwrap_or(DEFAULT_MIME_TYPE);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(
            FileKind::from_mime_type(mime_type),
            mime_type,
            name,
            data,
        ))
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Text content of the message
    #[serde(default)]
    pub content: String,

    /// Attached files, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileAttachment>,

    /// Tool calls this message answers (tool messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Results of executed tool calls (tool messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolCallResult>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            files: Vec::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Create a tool message carrying executed results and the calls they answer
    pub fn tool_results(calls: Vec<ToolCall>, results: Vec<ToolCallResult>) -> Self {
        let mut message = Self::with_role(MessageRole::Tool, "");
        message.tool_calls = calls;
        message.tool_results = results;
        message
    }

    /// Attach a file
    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    /// Attach several files, preserving order
    pub fn with_files(mut self, files: impl IntoIterator<Item = FileAttachment>) -> Self {
        self.files.extend(files);
        self
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name, unique within one options set
    pub name: String,

    /// Human readable description
    pub description: String,

    /// Parameters schema (JSON Schema)
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Tool choice configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Never call tools
    None,
    /// Force a specific function by name
    Function(String),
}

/// A tool call requested by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned identifier, echoed back in the result
    pub id: String,

    /// Name of the function to run
    pub function_name: String,

    /// Arguments as an arbitrary JSON object; never inspected by the router
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments,
        }
    }

    /// Look up a single argument
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Look up a string argument
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Result of executing a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Matches the originating [`ToolCall::id`]
    pub id: String,

    /// Arbitrary result payload
    pub content: Value,
}

impl ToolCallResult {
    pub fn new(id: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Options for a routed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Sampling temperature, nominally in [0, 1]; not validated
    pub temperature: f32,

    /// Restrict every provider to this model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_model: Option<String>,

    /// Tools offered to the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Tool choice
    #[serde(default)]
    pub tool_choice: ToolChoice,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            force_model: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }
}

impl QueryOptions {
    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Force a specific model
    pub fn with_force_model(mut self, model: impl Into<String>) -> Self {
        self.force_model = Some(model.into());
        self
    }

    /// Replace the tool set
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Add a single tool
    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set tool choice
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

/// Result of a query answered by one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Generated text
    pub content: String,

    /// Model that actually answered
    pub model: String,

    /// Tool calls requested by the model, possibly empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Finish reason reported by the backend
    #[serde(default)]
    pub finish_reason: String,

    /// Token usage if the backend reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl QueryResult {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            tool_calls: Vec::new(),
            finish_reason: String::new(),
            usage: None,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = reason.into();
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// True when the response carries neither text nor tool calls
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.tool_calls.is_empty()
    }

    /// Tokens to charge for this answer: the reported total, or an estimate
    /// of `prompt` when the backend sent no usage
    pub fn tokens_used(&self, prompt: &[Message]) -> u32 {
        self.usage
            .map(|usage| usage.total_tokens)
            .unwrap_or_else(|| estimate_tokens(prompt))
    }
}

/// Rough token estimate for a message list (about four characters per token)
pub fn estimate_tokens(messages: &[Message]) -> u32 {
    messages
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| tokens_for_chars(m.content.chars().count()))
        .fold(0u32, u32::saturating_add)
}

fn tokens_for_chars(chars: usize) -> u32 {
    (u32::try_from(chars).unwrap_or(u32::MAX) / 4).max(1)
}
