/// LLM Client — the single point of entry for all completion API calls.
///
/// ARCHITECTURAL RULE: No other module may call the upstream API directly.
/// All LLM interactions MUST go through this module.
///
/// One attempt per user request. There is no retry loop: a failed call is
/// reported to the client, who decides whether to ask again.
use axum::http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::Config;
use crate::models::chat::ChatMessage;

pub mod normalize;

pub use normalize::normalize;

/// The model used for all completions.
/// Hardcoded so deployments cannot drift.
pub const MODEL: &str = "openai/gpt-4o-mini";
/// Output ceiling per reply. Keeps answers short and inside free-tier limits.
pub const MAX_TOKENS: u32 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key is not configured")]
    NotConfigured,

    #[error("Upstream returned a non-JSON body (status {status})")]
    InvalidResponse { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Upstream returned no choices: {message}")]
    NoChoices { message: String },

    #[error("LLM returned empty content")]
    EmptyReply,

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
}

impl LlmError {
    /// HTTP status surfaced to the chat client for this outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LlmError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            LlmError::InvalidResponse { .. } | LlmError::Api { .. } | LlmError::Unreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
            LlmError::NoChoices { .. } | LlmError::EmptyReply => StatusCode::INTERNAL_SERVER_ERROR,
            LlmError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Sanitized message for the chat client. Never contains transport internals.
    pub fn client_message(&self) -> String {
        match self {
            LlmError::NotConfigured => {
                "Chat is not configured. Set OPENROUTER_API_KEY in .env.".to_string()
            }
            LlmError::InvalidResponse { .. } => {
                "AI service returned an invalid response. Try again later.".to_string()
            }
            LlmError::Api { message, .. } | LlmError::NoChoices { message } => message.clone(),
            LlmError::EmptyReply => "AI returned an empty reply.".to_string(),
            LlmError::Timeout => "AI service timed out. Try again.".to_string(),
            LlmError::Unreachable(_) => "Unable to reach AI service. Try again later.".to_string(),
        }
    }

    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            error!("Upstream request timed out: {e}");
            LlmError::Timeout
        } else {
            error!("Upstream request failed: {e}");
            LlmError::Unreachable(e)
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

/// The single LLM client used by the chat route.
/// Wraps an OpenAI-compatible chat completions endpoint with a hard timeout.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    referer: Option<String>,
    title: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(config.upstream_timeout).build()?,
            api_key: config.openrouter_api_key.clone(),
            endpoint: config.upstream_url.clone(),
            referer: config.site_url.clone(),
            title: config.app_title.clone(),
        })
    }

    /// Whether a call could be attempted at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends the conversation upstream and returns the reply text.
    ///
    /// Fails closed: without an API key nothing is sent.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let request_body = CompletionRequest {
            model: MODEL,
            messages,
            max_tokens: MAX_TOKENS,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .header("X-Title", &self.title)
            .json(&request_body);
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }

        let response = request.send().await.map_err(LlmError::from_transport)?;
        let status = response.status();
        let body = response.text().await.map_err(LlmError::from_transport)?;

        debug!(
            "Upstream responded: status={}, bytes={}, messages_sent={}",
            status.as_u16(),
            body.len(),
            messages.len()
        );

        normalize(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::{
        closed_port_url, spawn_hanging_upstream, spawn_upstream, test_config,
    };

    #[derive(Clone, Default)]
    struct Captured {
        headers: Arc<Mutex<Option<HeaderMap>>>,
        body: Arc<Mutex<Option<Value>>>,
    }

    async fn capture(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        *captured.headers.lock().unwrap() = Some(headers);
        *captured.body.lock().unwrap() = Some(body);
        Json(json!({"choices": [{"message": {"role": "assistant", "content": "Hi there"}}]}))
    }

    fn client_for(url: &str) -> LlmClient {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(url, &dir.path().join("data.json"));
        config.site_url = Some("https://portfolio.example".to_string());
        LlmClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_model_and_ceiling() {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v1/chat/completions", post(capture))
            .with_state(captured.clone());
        let url = spawn_upstream(app).await;

        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("hello")];
        let reply = client_for(&url).complete(&messages).await.unwrap();
        assert_eq!(reply, "Hi there");

        let headers = captured.headers.lock().unwrap().clone().unwrap();
        assert_eq!(headers["authorization"], "Bearer test-key");
        assert_eq!(headers["http-referer"], "https://portfolio.example");
        assert_eq!(headers["x-title"], "Portfolio AI");

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], MODEL);
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&closed_port_url().await, &dir.path().join("data.json"));
        config.openrouter_api_key = None;
        let client = LlmClient::new(&config).unwrap();

        assert!(!client.is_configured());
        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_timeout_is_bounded_and_maps_to_504() {
        let url = spawn_hanging_upstream().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&url, &dir.path().join("data.json"));
        config.upstream_timeout = Duration::from_millis(200);
        let client = LlmClient::new(&config).unwrap();

        let started = Instant::now();
        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout), "got {err:?}");
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_unreachable() {
        let url = closed_port_url().await;
        let err = client_for(&url)
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unreachable(_)), "got {err:?}");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.client_message(),
            "Unable to reach AI service. Try again later."
        );
    }
}
