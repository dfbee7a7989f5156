//! HTTP error mapping utilities

use crate::providers::error::ProviderError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

/// Map an HTTP status code and response body to a [`ProviderError`]
pub fn map_http_error(
    status: StatusCode,
    headers: Option<&HeaderMap>,
    body: Option<String>,
    request_id: Uuid,
) -> ProviderError {
    let error_details = body
        .as_ref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_details(&v));

    let error_message = error_details
        .as_ref()
        .map(|d| d.message.clone())
        .or_else(|| body.clone().filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    let message_with_id = format!("{} [request_id: {}]", error_message, request_id);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Authentication(message_with_id)
        }

        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = headers
                .and_then(|h| h.get(RETRY_AFTER))
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .or_else(|| error_details.and_then(|d| d.retry_after_seconds));

            ProviderError::RateLimit {
                message: message_with_id,
                retry_after_secs,
            }
        }

        StatusCode::BAD_REQUEST => ProviderError::InvalidRequest(message_with_id),

        StatusCode::PAYMENT_REQUIRED => ProviderError::InsufficientQuota(message_with_id),

        StatusCode::NOT_FOUND => ProviderError::ModelNotFound(
            extract_model_from_error(&error_message).unwrap_or(message_with_id),
        ),

        status if status.is_server_error() => ProviderError::ServiceUnavailable(message_with_id),

        _ => ProviderError::Status {
            status: status.as_u16(),
            message: message_with_id,
        },
    }
}

/// Error details extracted from a response body
struct ErrorDetails {
    message: String,
    retry_after_seconds: Option<u64>,
}

fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // OpenAI and OpenRouter: { "error": { "message": "...", "code": ... } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(Value::as_str) {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after_seconds: error.get("retry_after").and_then(Value::as_u64),
            });
        }
        if let Some(message) = error.as_str() {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after_seconds: None,
            });
        }
    }

    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Some(ErrorDetails {
            message: message.to_string(),
            retry_after_seconds: json.get("retry_after").and_then(Value::as_u64),
        });
    }

    None
}

/// Pull the model name out of messages like "model 'gpt-4' not found"
fn extract_model_from_error(message: &str) -> Option<String> {
    for (open, close) in [("model '", '\''), ("model \"", '"'), ("model `", '`')] {
        if let Some(start) = message.find(open) {
            let start = start + open.len();
            if let Some(end) = message[start..].find(close) {
                return Some(message[start..start + end].to_string());
            }
        }
    }
    None
}

/// Parse a Retry-After header value given in seconds
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    header_value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use test_case::test_case;

    #[test_case(401; "unauthorized")]
    #[test_case(403; "forbidden")]
    fn test_auth_statuses(code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        let err = map_http_error(status, None, Some("nope".into()), Uuid::nil());
        assert!(matches!(err, ProviderError::Authentication(_)));
    }

    #[test]
    fn test_rate_limit_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        let body = r#"{"error":{"message":"slow down","retry_after":3}}"#.to_string();

        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(&headers),
            Some(body),
            Uuid::nil(),
        );
        match err {
            ProviderError::RateLimit {
                message,
                retry_after_secs,
            } => {
                assert!(message.starts_with("slow down"));
                assert_eq!(retry_after_secs, Some(12));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_extracts_model() {
        let body = r#"{"error":{"message":"The model 'gpt-9' does not exist"}}"#.to_string();
        let err = map_http_error(StatusCode::NOT_FOUND, None, Some(body), Uuid::nil());
        assert!(matches!(err, ProviderError::ModelNotFound(model) if model == "gpt-9"));
    }

    #[test_case(500; "internal")]
    #[test_case(502; "bad gateway")]
    #[test_case(503; "unavailable")]
    fn test_server_errors(code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        let err = map_http_error(status, None, None, Uuid::nil());
        assert!(matches!(err, ProviderError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_other_status_keeps_code() {
        let err = map_http_error(StatusCode::IM_A_TEAPOT, None, None, Uuid::nil());
        assert!(matches!(
            err,
            ProviderError::Status { status: 418, .. }
        ));
    }
}
