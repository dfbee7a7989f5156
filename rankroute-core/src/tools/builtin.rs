//! A small executor with clock, arithmetic and string tools
//!
//! Useful for wiring up tool calling end to end before plugging in real
//! tools.

use crate::protocol::{ToolCall, ToolCallResult, ToolDefinition};
use crate::providers::tool_relay::{ToolError, ToolExecutor};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const GET_CURRENT_TIME: &str = "get_current_time";
const CALCULATE: &str = "calculate";
const STRING_OPERATIONS: &str = "string_operations";

/// Executor exposing `get_current_time`, `calculate` and `string_operations`
#[derive(Debug, Clone)]
pub struct BuiltinToolExecutor {
    tools: Vec<ToolDefinition>,
}

impl Default for BuiltinToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinToolExecutor {
    pub fn new() -> Self {
        let tools = vec![
            ToolDefinition::new(
                GET_CURRENT_TIME,
                "Get the current date and time",
                json!({
                    "type": "object",
                    "properties": {
                        "format": {
                            "type": "string",
                            "description": "Time format (e.g., 'RFC3339', 'Unix')",
                            "enum": ["RFC3339", "Unix"]
                        }
                    },
                    "required": []
                }),
            ),
            ToolDefinition::new(
                CALCULATE,
                "Perform mathematical calculations",
                json!({
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "Expression to evaluate (e.g., '2 + 2', 'sqrt(16)')"
                        }
                    },
                    "required": ["expression"]
                }),
            ),
            ToolDefinition::new(
                STRING_OPERATIONS,
                "Perform string operations like length, uppercase, lowercase",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "Text to operate on"
                        },
                        "operation": {
                            "type": "string",
                            "description": "Operation to perform",
                            "enum": ["length", "uppercase", "lowercase", "reverse"]
                        }
                    },
                    "required": ["text", "operation"]
                }),
            ),
        ];
        Self { tools }
    }

    fn current_time(&self, call: &ToolCall) -> String {
        let now = Utc::now();
        match call.argument_str("format") {
            Some("Unix") => now.timestamp().to_string(),
            _ => now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    fn calculate(&self, call: &ToolCall) -> Result<String, ToolError> {
        let expression = call
            .argument_str("expression")
            .ok_or_else(|| ToolError::invalid_argument("expression", "required string"))?;
        evaluate(expression).map_err(|message| ToolError::execution(CALCULATE, message))
    }

    fn string_operation(&self, call: &ToolCall) -> Result<String, ToolError> {
        let text = call
            .argument_str("text")
            .ok_or_else(|| ToolError::invalid_argument("text", "required string"))?;
        let operation = call
            .argument_str("operation")
            .ok_or_else(|| ToolError::invalid_argument("operation", "required string"))?;

        match operation {
            "length" => Ok(text.chars().count().to_string()),
            "uppercase" => Ok(text.to_uppercase()),
            "lowercase" => Ok(text.to_lowercase()),
            "reverse" => Ok(text.chars().rev().collect()),
            other => Err(ToolError::invalid_argument(
                "operation",
                format!("unknown operation: {}", other),
            )),
        }
    }
}

/// Evaluate `a op b` or `sqrt(x)`, formatted to two decimals
fn evaluate(expression: &str) -> Result<String, String> {
    let expression = expression.trim();

    if let Some(inner) = expression
        .strip_prefix("sqrt(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let value: f64 = inner
            .trim()
            .parse()
            .map_err(|_| format!("invalid number in sqrt: {}", inner))?;
        if value < 0.0 {
            return Err("cannot take square root of negative number".to_string());
        }
        return Ok(format!("{:.2}", value.sqrt()));
    }

    let parts: Vec<&str> = expression.split_whitespace().collect();
    let [lhs, op, rhs] = parts.as_slice() else {
        return Err("expression must be in format 'number operator number'".to_string());
    };

    let a: f64 = lhs
        .parse()
        .map_err(|_| format!("invalid first number: {}", lhs))?;
    let b: f64 = rhs
        .parse()
        .map_err(|_| format!("invalid second number: {}", rhs))?;

    let result = match *op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => {
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            a / b
        }
        other => return Err(format!("unknown operator: {}", other)),
    };

    Ok(format!("{:.2}", result))
}

#[async_trait]
impl ToolExecutor for BuiltinToolExecutor {
    async fn execute_tool(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult, ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        debug!(tool = %call.function_name, call_id = %call.id, "Executing builtin tool");

        let content = match call.function_name.as_str() {
            GET_CURRENT_TIME => self.current_time(call),
            CALCULATE => self.calculate(call)?,
            STRING_OPERATIONS => self.string_operation(call)?,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        Ok(ToolCallResult::new(&call.id, content))
    }

    fn available_tools(&self) -> Vec<ToolDefinition> {
        self.tools.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use test_case::test_case;

    fn call(name: &str, args: Value) -> ToolCall {
        let arguments = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ToolCall::new("call_1", name, arguments)
    }

    #[test_case("2 + 2", "4.00")]
    #[test_case("10 / 4", "2.50")]
    #[test_case("3 * -1.5", "-4.50")]
    #[test_case("7 - 10", "-3.00")]
    #[test_case(" sqrt(16) ", "4.00")]
    fn test_evaluate(expression: &str, expected: &str) {
        assert_eq!(evaluate(expression).unwrap(), expected);
    }

    #[test_case("1 / 0", "division by zero")]
    #[test_case("sqrt(-4)", "cannot take square root of negative number")]
    #[test_case("2 ^ 3", "unknown operator: ^")]
    #[test_case("2 +", "expression must be in format 'number operator number'")]
    fn test_evaluate_errors(expression: &str, message: &str) {
        assert_eq!(evaluate(expression).unwrap_err(), message);
    }

    #[tokio::test]
    async fn test_string_operations() {
        let executor = BuiltinToolExecutor::new();
        let token = CancellationToken::new();

        let result = executor
            .execute_tool(
                &call(STRING_OPERATIONS, json!({"text": "héllo", "operation": "reverse"})),
                &token,
            )
            .await
            .unwrap();
        assert_eq!(result.content, json!("olléh"));
        assert_eq!(result.id, "call_1");

        let result = executor
            .execute_tool(
                &call(STRING_OPERATIONS, json!({"text": "héllo", "operation": "length"})),
                &token,
            )
            .await
            .unwrap();
        assert_eq!(result.content, json!("5"));
    }

    #[tokio::test]
    async fn test_unix_time_is_numeric() {
        let executor = BuiltinToolExecutor::new();
        let result = executor
            .execute_tool(
                &call(GET_CURRENT_TIME, json!({"format": "Unix"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let seconds: i64 = result.content.as_str().unwrap().parse().unwrap();
        assert!(seconds > 1_600_000_000);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_missing_args() {
        let executor = BuiltinToolExecutor::new();
        let token = CancellationToken::new();

        let err = executor
            .execute_tool(&call("weather", json!({})), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "weather"));

        let err = executor
            .execute_tool(&call(CALCULATE, json!({})), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }

    #[test]
    fn test_tool_definitions() {
        let names: Vec<String> = BuiltinToolExecutor::new()
            .available_tools()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec![GET_CURRENT_TIME, CALCULATE, STRING_OPERATIONS]);
    }
}
