//! Shared fixtures for tests: configs, fake upstream servers.

use std::path::Path;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::{Config, MemoryPolicy};

pub fn test_config(upstream_url: &str, data_file: &Path) -> Config {
    Config {
        openrouter_api_key: Some("test-key".to_string()),
        data_file: data_file.to_path_buf(),
        upstream_url: upstream_url.to_string(),
        upstream_timeout: Duration::from_secs(5),
        site_url: None,
        app_title: "Portfolio AI".to_string(),
        owner_name: "Hudson".to_string(),
        prompt_template_file: None,
        memory: MemoryPolicy::Stateless,
        history_dir: data_file.with_file_name("history"),
        history_window: 4,
        history_max_messages: 40,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// Serves `app` on an ephemeral port; returns its chat completions URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1/chat/completions")
}

/// Accepts connections and never answers.
pub async fn spawn_hanging_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}/v1/chat/completions")
}

/// A URL on a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1/chat/completions")
}
