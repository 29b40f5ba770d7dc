use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// How much conversation the server keeps between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPolicy {
    /// Every request is `[system, user]`; nothing is persisted.
    Stateless,
    /// Recent turns are persisted per session and replayed upstream.
    Bounded,
}

impl MemoryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryPolicy::Stateless => "stateless",
            MemoryPolicy::Bounded => "bounded",
        }
    }
}

impl FromStr for MemoryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stateless" => Ok(MemoryPolicy::Stateless),
            "bounded" => Ok(MemoryPolicy::Bounded),
            other => bail!("CHAT_MEMORY must be 'stateless' or 'bounded', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Only malformed values abort startup. A missing API key is tolerated here and
/// surfaces as a 503 from the chat route instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: Option<String>,
    pub data_file: PathBuf,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub site_url: Option<String>,
    pub app_title: String,
    pub owner_name: String,
    pub prompt_template_file: Option<PathBuf>,
    pub memory: MemoryPolicy,
    pub history_dir: PathBuf,
    pub history_window: usize,
    pub history_max_messages: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            openrouter_api_key: optional_env("OPENROUTER_API_KEY"),
            data_file: env_or("PORTFOLIO_DATA_FILE", "data.json").into(),
            upstream_url: env_or("UPSTREAM_URL", DEFAULT_UPSTREAM_URL),
            upstream_timeout: Duration::from_secs(parse_env("UPSTREAM_TIMEOUT_SECS", 45)?),
            site_url: optional_env("SITE_URL"),
            app_title: env_or("APP_TITLE", "Portfolio AI"),
            owner_name: env_or("PORTFOLIO_OWNER", "Hudson"),
            prompt_template_file: optional_env("PROMPT_TEMPLATE_FILE").map(PathBuf::from),
            memory: parse_env("CHAT_MEMORY", MemoryPolicy::Stateless)?,
            history_dir: env_or("HISTORY_DIR", "chat_history").into(),
            history_window: parse_env("HISTORY_WINDOW", 4)?,
            history_max_messages: parse_env("HISTORY_MAX_MESSAGES", 40)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        };

        if config.history_window == 0 {
            bail!("HISTORY_WINDOW must be at least 1");
        }
        if config.history_max_messages < config.history_window {
            bail!("HISTORY_MAX_MESSAGES must be >= HISTORY_WINDOW");
        }

        Ok(config)
    }
}

/// Reads a variable, treating empty or whitespace-only values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_policy_parses_case_insensitively() {
        assert_eq!(
            "Bounded".parse::<MemoryPolicy>().unwrap(),
            MemoryPolicy::Bounded
        );
        assert_eq!(
            " stateless ".parse::<MemoryPolicy>().unwrap(),
            MemoryPolicy::Stateless
        );
    }

    #[test]
    fn test_memory_policy_rejects_unknown_mode() {
        let err = "forever".parse::<MemoryPolicy>().unwrap_err();
        assert!(err.to_string().contains("forever"));
    }
}
