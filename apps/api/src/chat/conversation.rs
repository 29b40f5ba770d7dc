use crate::models::chat::{ChatMessage, Role};

/// Builds the message list sent upstream.
///
/// `prior` is the replay window for bounded-memory sessions (`None` when the
/// server keeps no memory). The result always starts with exactly one system
/// message followed by at most `window` non-system messages, the last being the
/// new user turn.
pub fn assemble(
    system_prompt: String,
    user_message: &str,
    prior: Option<&[ChatMessage]>,
    window: usize,
) -> Vec<ChatMessage> {
    let user = ChatMessage::user(user_message);
    let mut turns: Vec<&ChatMessage> = prior
        .unwrap_or_default()
        .iter()
        .filter(|m| m.role != Role::System)
        .collect();
    turns.push(&user);

    let skip = turns.len().saturating_sub(window.max(1));

    let mut conversation = Vec::with_capacity(turns.len() - skip + 1);
    conversation.push(ChatMessage::system(system_prompt));
    conversation.extend(turns.into_iter().skip(skip).cloned());
    conversation
}
