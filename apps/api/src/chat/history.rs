//! Bounded conversation memory.
//!
//! One JSON file per session under the history directory, holding an array of
//! `{role, content, at}` turns. Files are capped at `max_messages` (oldest turns
//! dropped) and always replaced atomically, so a reader sees either the old or
//! the new array, never a partial write. Read-modify-write cycles on the same
//! session are serialized in-process.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::chat::{ChatMessage, StoredTurn};

pub struct HistoryStore {
    dir: PathBuf,
    window: usize,
    max_messages: usize,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl HistoryStore {
    /// Creates the history directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, window: usize, max_messages: usize) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create history directory {}", dir.display()))?;
        info!(
            "Chat history stored in {} (window={window}, cap={max_messages})",
            dir.display()
        );
        Ok(Self {
            dir,
            window,
            max_messages: max_messages.max(window),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Number of most recent messages replayed upstream, new user turn included.
    pub fn window(&self) -> usize {
        self.window
    }

    /// The tail of a session's history, at most `window` messages.
    pub async fn recent(&self, session: Uuid) -> Result<Vec<ChatMessage>> {
        let stored = self.read(session).await?;
        let skip = stored.len().saturating_sub(self.window);
        Ok(stored.into_iter().skip(skip).map(ChatMessage::from).collect())
    }

    /// Appends turns to a session and rewrites its file under the session lock.
    pub async fn append(&self, session: Uuid, turns: Vec<ChatMessage>) -> Result<()> {
        let result = {
            let lock = self.session_lock(session);
            let _guard = lock.lock().await;
            self.rewrite(session, turns).await
        };
        // Released on failure too, or the map keeps one entry per broken session.
        self.release_lock(session);
        result
    }

    async fn rewrite(&self, session: Uuid, turns: Vec<ChatMessage>) -> Result<()> {
        let mut stored = self.read(session).await?;
        stored.extend(turns.into_iter().map(StoredTurn::now));
        if stored.len() > self.max_messages {
            let excess = stored.len() - self.max_messages;
            stored.drain(..excess);
        }
        self.write_atomic(session, &stored).await?;
        debug!("Session {session} history now {} messages", stored.len());
        Ok(())
    }

    fn path_for(&self, session: Uuid) -> PathBuf {
        self.dir.join(format!("{session}.json"))
    }

    async fn read(&self, session: Uuid) -> Result<Vec<StoredTurn>> {
        let path = self.path_for(session);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read history {}", path.display()))
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(turns) => Ok(turns),
            Err(e) => {
                // A broken file only costs this session its memory.
                warn!("Discarding corrupt history {}: {e}", path.display());
                Ok(Vec::new())
            }
        }
    }

    async fn write_atomic(&self, session: Uuid, stored: &[StoredTurn]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(stored)?;
        let dir = self.dir.clone();
        let path = self.path_for(session);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path)
                .with_context(|| format!("Failed to replace history {}", path.display()))?;
            Ok(())
        })
        .await?
    }

    fn session_lock(&self, session: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(session).or_default())
    }

    /// Drops the session's lock entry once nobody else holds it.
    fn release_lock(&self, session: Uuid) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&session)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&session);
        }
    }
}
