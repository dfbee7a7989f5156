//! Conversion between the routed protocol and the chat-completions format

use super::types::*;
use crate::protocol::{
    Message, MessageRole, QueryOptions, QueryResult, TokenUsage, ToolCall, ToolCallResult,
    ToolChoice, ToolDefinition,
};
use crate::providers::error::{ProviderError, ProviderResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

/// Key under which unparsable tool-call arguments are preserved
pub const RAW_ARGUMENTS_KEY: &str = "_raw";

/// Build a chat-completions request for one model
pub fn to_request(model: &str, messages: &[Message], options: &QueryOptions) -> ChatCompletionRequest {
    let tools = (!options.tools.is_empty())
        .then(|| options.tools.iter().map(to_wire_tool).collect::<Vec<_>>());
    let tool_choice = tools.as_ref().map(|_| to_wire_tool_choice(&options.tool_choice));

    ChatCompletionRequest {
        model: model.to_string(),
        messages: to_wire_messages(messages),
        temperature: options.temperature,
        tools,
        tool_choice,
    }
}

/// Convert messages, expanding tool messages into the assistant/tool pair
pub fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role == MessageRole::Tool {
            wire.extend(expand_tool_message(message));
            continue;
        }

        wire.push(WireMessage {
            role: message.role.as_str().to_string(),
            content: Some(to_wire_content(message)),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    wire
}

fn to_wire_content(message: &Message) -> WireContent {
    if !message.has_files() {
        return WireContent::Text(message.content.clone());
    }

    let mut parts = Vec::with_capacity(message.files.len() + 1);
    if !message.content.is_empty() {
        parts.push(WireContentPart::Text {
            text: message.content.clone(),
        });
    }
    for file in &message.files {
        parts.push(WireContentPart::ImageUrl {
            image_url: WireImageUrl {
                url: format!(
                    "data:{};base64,{}",
                    file.mime_type(),
                    STANDARD.encode(file.data())
                ),
            },
        });
    }
    WireContent::Parts(parts)
}

fn expand_tool_message(message: &Message) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(message.tool_results.len() + 1);

    if !message.tool_calls.is_empty() {
        wire.push(WireMessage {
            role: MessageRole::Assistant.as_str().to_string(),
            content: None,
            tool_calls: Some(message.tool_calls.iter().map(to_wire_tool_call).collect()),
            tool_call_id: None,
        });
    }

    wire.extend(message.tool_results.iter().map(|result| WireMessage {
        role: MessageRole::Tool.as_str().to_string(),
        content: Some(WireContent::Text(result_text(result))),
        tool_calls: None,
        tool_call_id: Some(result.id.clone()),
    }));

    wire
}

fn result_text(result: &ToolCallResult) -> String {
    match &result.content {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn to_wire_tool_call(call: &ToolCall) -> WireToolCall {
    WireToolCall {
        id: call.id.clone(),
        tool_type: function_type(),
        function: WireFunctionCall {
            name: call.function_name.clone(),
            arguments: Value::Object(call.arguments.clone()).to_string(),
        },
    }
}

fn to_wire_tool(tool: &ToolDefinition) -> WireTool {
    WireTool {
        tool_type: function_type(),
        function: WireFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn to_wire_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Function(name) => json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

/// Convert a response into a [`QueryResult`] attributed to `model`
pub fn from_response(response: ChatCompletionResponse, model: &str) -> ProviderResult<QueryResult> {
    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ParseError("no response choices received".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(from_wire_tool_call)
        .collect();

    let mut result = QueryResult::new(choice.message.content.unwrap_or_default(), model)
        .with_tool_calls(tool_calls)
        .with_finish_reason(choice.finish_reason.unwrap_or_default());
    result.usage = usage;
    Ok(result)
}

fn from_wire_tool_call(call: WireToolCall) -> ToolCall {
    ToolCall::new(call.id, call.function.name, parse_arguments(&call.function.arguments))
}

/// Parse JSON-encoded arguments; anything that is not an object is kept raw
pub fn parse_arguments(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert(RAW_ARGUMENTS_KEY.to_string(), Value::String(raw.to_string()));
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FileAttachment, FileKind};

    #[test]
    fn test_text_message_is_plain_string() {
        let wire = to_wire_messages(&[Message::system("be brief"), Message::user("hi")]);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].content, Some(WireContent::Text("hi".into())));
    }

    #[test]
    fn test_files_become_data_url_parts() {
        let file = FileAttachment::new(FileKind::Image, "image/png", "dot.png", vec![1u8, 2, 3]);
        let wire = to_wire_messages(&[Message::user("look").with_file(file)]);

        let Some(WireContent::Parts(parts)) = &wire[0].content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1],
            WireContentPart::ImageUrl {
                image_url: WireImageUrl {
                    url: "data:image/png;base64,AQID".into()
                }
            }
        );
    }

    #[test]
    fn test_tool_message_expands() {
        let mut args = Map::new();
        args.insert("x".into(), json!(4));
        let call = ToolCall::new("c1", "calculate", args);
        let message = Message::tool_results(
            vec![call],
            vec![ToolCallResult::new("c1", "2.00")],
        );

        let wire = to_wire_messages(&[message]);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "assistant");
        let calls = wire[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"x":4}"#);
        assert_eq!(wire[1].role, "tool");
        assert_eq!(wire[1].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(wire[1].content, Some(WireContent::Text("2.00".into())));
    }

    #[test]
    fn test_tool_choice_only_with_tools() {
        let options = QueryOptions::default();
        let request = to_request("m", &[Message::user("hi")], &options);
        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());

        let options = options
            .with_tool(ToolDefinition::new("t", "d", json!({"type": "object"})))
            .with_tool_choice(ToolChoice::Function("t".into()));
        let request = to_request("m", &[Message::user("hi")], &options);
        assert_eq!(request.tools.as_ref().unwrap()[0].tool_type, "function");
        assert_eq!(
            request.tool_choice,
            Some(json!({"type": "function", "function": {"name": "t"}}))
        );
    }

    #[test]
    fn test_parse_arguments_keeps_raw_on_failure() {
        assert_eq!(parse_arguments(r#"{"a":1}"#)["a"], json!(1));
        assert!(parse_arguments("").is_empty());
        assert_eq!(parse_arguments("not json")[RAW_ARGUMENTS_KEY], json!("not json"));
        assert_eq!(parse_arguments("[1,2]")[RAW_ARGUMENTS_KEY], json!("[1,2]"));
    }

    #[test]
    fn test_zero_choices_is_parse_error() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let err = from_response(response, "m").unwrap_err();
        assert!(matches!(err, ProviderError::ParseError(msg) if msg == "no response choices received"));
    }
}
