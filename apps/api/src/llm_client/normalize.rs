//! Maps an upstream HTTP outcome onto the reply text or a client-facing `LlmError`.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use super::LlmError;

/// Generic message used when the upstream gives nothing readable.
pub const GENERIC_API_ERROR: &str = "API Error";

/// Turns a completed upstream response (status + raw body) into the reply text.
///
/// Order matters: the body must parse before the status is inspected, so an HTML
/// error page from a proxy is reported as an invalid response rather than an
/// upstream error.
pub fn normalize(status: StatusCode, body: &str) -> Result<String, LlmError> {
    let payload: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => {
            warn!("Upstream returned non-JSON (status={})", status.as_u16());
            return Err(LlmError::InvalidResponse {
                status: status.as_u16(),
            });
        }
    };

    if !status.is_success() {
        let message = extract_error_message(&payload);
        warn!("Upstream returned {}: {}", status.as_u16(), message);
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let first_choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first());

    let Some(choice) = first_choice else {
        let message = extract_error_message(&payload);
        warn!("Upstream returned no choices: {message}");
        return Err(LlmError::NoChoices { message });
    };

    let content = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string);
    if content.is_none() {
        warn!("Upstream returned an empty reply (status={})", status.as_u16());
    }
    content.ok_or(LlmError::EmptyReply)
}

/// Best available human-readable error string from an upstream payload.
///
/// Handles `{"error": "text"}`, `{"error": {"message": "text"}}` and one extra
/// level of nesting (`{"error": {"message": {"message": "text"}}}`). Anything
/// else falls back to [`GENERIC_API_ERROR`].
pub fn extract_error_message(payload: &Value) -> String {
    let message = match payload.get("error") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(err)) => match err.get("message") {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(inner)) => inner.get("message").and_then(Value::as_str),
            _ => None,
        },
        _ => None,
    };

    message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(GENERIC_API_ERROR)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as Outcome;
    use serde_json::json;

    fn ok(body: Value) -> Result<String, LlmError> {
        normalize(StatusCode::OK, &body.to_string())
    }

    #[test]
    fn test_success_returns_first_choice_content() {
        let reply = ok(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "Hello"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();
        assert_eq!(reply, "Hello");
    }

    #[test]
    fn test_non_json_body_is_invalid_response_even_on_error_status() {
        let err = normalize(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { status: 502 }));
        assert_eq!(err.status_code(), Outcome::BAD_GATEWAY);
    }

    #[test]
    fn test_http_error_unwraps_nested_message() {
        let body = json!({"error": {"message": "Rate limit exceeded", "code": 429}});
        let err = normalize(StatusCode::TOO_MANY_REQUESTS, &body.to_string()).unwrap_err();
        match &err {
            LlmError::Api { status, message } => {
                assert_eq!(*status, 429);
                assert_eq!(message, "Rate limit exceeded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(err.status_code(), Outcome::BAD_GATEWAY);
        assert_eq!(err.client_message(), "Rate limit exceeded");
    }

    #[test]
    fn test_http_error_with_doubly_nested_message() {
        let body = json!({"error": {"message": {"message": "Invalid model"}}});
        let err = normalize(StatusCode::BAD_REQUEST, &body.to_string()).unwrap_err();
        assert_eq!(err.client_message(), "Invalid model");
    }

    #[test]
    fn test_http_error_with_string_error() {
        let body = json!({"error": "No auth credentials found"});
        let err = normalize(StatusCode::UNAUTHORIZED, &body.to_string()).unwrap_err();
        assert_eq!(err.client_message(), "No auth credentials found");
    }

    #[test]
    fn test_http_error_with_unknown_shape_falls_back() {
        let body = json!({"detail": "nope"});
        let err = normalize(StatusCode::INTERNAL_SERVER_ERROR, &body.to_string()).unwrap_err();
        assert_eq!(err.client_message(), GENERIC_API_ERROR);
        assert_eq!(err.status_code(), Outcome::BAD_GATEWAY);
    }

    #[test]
    fn test_empty_choices_is_api_error_500() {
        let err = ok(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LlmError::NoChoices { .. }));
        assert_eq!(err.status_code(), Outcome::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), GENERIC_API_ERROR);
    }

    #[test]
    fn test_missing_choices_surfaces_upstream_message() {
        let err = ok(json!({"error": {"message": "Provider returned error"}})).unwrap_err();
        assert_eq!(err.status_code(), Outcome::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Provider returned error");
    }

    #[test]
    fn test_empty_content_is_empty_reply() {
        let err = ok(json!({"choices": [{"message": {"content": ""}}]})).unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
        assert_eq!(err.status_code(), Outcome::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_message_is_empty_reply() {
        let err = ok(json!({"choices": [{"finish_reason": "length"}]})).unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
    }

    #[test]
    fn test_non_string_content_is_empty_reply() {
        let err = ok(json!({"choices": [{"message": {"content": null}}]})).unwrap_err();
        assert!(matches!(err, LlmError::EmptyReply));
    }
}
