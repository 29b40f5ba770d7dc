use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a chat message, serialized the way completion APIs expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single `{role, content}` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A persisted history turn. `at` is optional so plain `{role, content}`
/// arrays written by older deployments still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

impl StoredTurn {
    pub fn now(message: ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content,
            at: Some(Utc::now()),
        }
    }
}

impl From<StoredTurn> for ChatMessage {
    fn from(turn: StoredTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content,
        }
    }
}
