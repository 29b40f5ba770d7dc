use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chat::history::HistoryStore;
use crate::chat::prompts::PromptTemplate;
use crate::config::{Config, MemoryPolicy};
use crate::llm_client::LlmClient;
use crate::profile::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Arc<Config>,
    /// Subject profile, re-read whenever the file changes.
    pub profiles: Arc<ProfileStore>,
    pub prompt: Arc<PromptTemplate>,
    /// Per-session memory. `None` in stateless mode.
    pub history: Option<Arc<HistoryStore>>,
}

impl AppState {
    pub async fn from_config(config: Config) -> Result<Self> {
        let llm = LlmClient::new(&config).context("Failed to build upstream HTTP client")?;

        let prompt =
            PromptTemplate::load(config.prompt_template_file.as_deref(), &config.owner_name)?;

        let history = match config.memory {
            MemoryPolicy::Stateless => None,
            MemoryPolicy::Bounded => Some(Arc::new(
                HistoryStore::open(
                    config.history_dir.clone(),
                    config.history_window,
                    config.history_max_messages,
                )
                .await?,
            )),
        };

        Ok(Self {
            llm,
            profiles: Arc::new(ProfileStore::new(config.data_file.clone())),
            prompt: Arc::new(prompt),
            history,
            config: Arc::new(config),
        })
    }
}
