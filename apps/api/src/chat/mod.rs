// Chat pipeline: request validation, prompt rendering, conversation assembly and
// optional per-session memory. All upstream calls go through llm_client.

pub mod conversation;
pub mod handlers;
pub mod history;
pub mod prompts;
