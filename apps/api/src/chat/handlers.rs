//! Axum route handler for the chat API.

use axum::{extract::State, Json};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chat::conversation::assemble;
use crate::errors::AppError;
use crate::llm_client::LlmError;
use crate::models::chat::ChatMessage;
use crate::profile::compact_profile;
use crate::state::AppState;

/// Longest accepted user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Validated chat request.
#[derive(Debug)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

impl ChatRequest {
    /// Parses the raw body by hand so every malformed shape gets the same
    /// `{"error": ...}` contract instead of the framework's rejection text.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let body: Value = serde_json::from_slice(body)
            .map_err(|_| AppError::Validation("Invalid JSON in request body.".to_string()))?;

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AppError::Validation("Message required".to_string()))?;

        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message is too long (max {MAX_MESSAGE_CHARS} characters)."
            )));
        }

        let session_id = match body.get("session_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| AppError::Validation("Invalid session_id".to_string()))?,
            ),
            Some(_) => return Err(AppError::Validation("Invalid session_id".to_string())),
        };

        Ok(Self {
            message: message.to_string(),
            session_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    /// Present only when the server keeps conversation memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/chat
///
/// Pipeline: validate → check key → load + compact profile → assemble →
/// upstream call → normalize. Every rejection before the upstream call is
/// final; nothing is retried.
pub async fn handle_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request = ChatRequest::parse(&body)?;

    if !state.llm.is_configured() {
        error!("OPENROUTER_API_KEY not set");
        return Err(LlmError::NotConfigured.into());
    }

    let profile = state.profiles.load().await.map_err(|e| {
        warn!("Profile unavailable: {e}");
        AppError::ServiceUnavailable(format!(
            "Portfolio data ({}) is missing or invalid.",
            state.profiles.display_name()
        ))
    })?;

    let system_prompt = state.prompt.render(&compact_profile(&profile));

    let Some(history) = state.history.as_ref() else {
        let conversation = assemble(system_prompt, &request.message, None, 1);
        let reply = state.llm.complete(&conversation).await?;
        return Ok(Json(ChatResponse {
            reply,
            session_id: None,
        }));
    };

    let session = request.session_id.unwrap_or_else(Uuid::new_v4);
    let prior = history.recent(session).await?;
    let conversation = assemble(
        system_prompt,
        &request.message,
        Some(&prior),
        history.window(),
    );

    // No lock is held here; the session is only locked while its file is rewritten.
    let reply = state.llm.complete(&conversation).await?;

    // The reply is already paid for; a storage failure only costs the memory.
    let exchange = vec![
        ChatMessage::user(request.message),
        ChatMessage::assistant(reply.clone()),
    ];
    match history.append(session, exchange).await {
        Ok(()) => info!("Session {session}: exchange stored"),
        Err(e) => error!("Session {session}: failed to store exchange: {e:?}"),
    }

    Ok(Json(ChatResponse {
        reply,
        session_id: Some(session),
    }))
}
