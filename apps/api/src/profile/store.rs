use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile file {0} does not exist")]
    Missing(PathBuf),

    #[error("profile file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile file {path} is not valid JSON: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Content identity used to decide whether the cached document is stale.
/// Modification times are too coarse on some filesystems to catch a
/// same-length edit, so the bytes themselves are hashed.
type Fingerprint = [u8; 32];

struct Cached {
    fingerprint: Fingerprint,
    value: Arc<Value>,
}

/// Read-through cache over the subject profile file.
///
/// Every `load` reads the file and hashes it; the JSON is re-parsed only when
/// the digest changed. A missing or broken file drops the cache, so the next
/// successful read always reflects the file on disk.
pub struct ProfileStore {
    path: PathBuf,
    cached: RwLock<Option<Cached>>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in client-facing messages; never the full server path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.json".to_string())
    }

    pub async fn load(&self) -> Result<Arc<Value>, ProfileError> {
        let result = self.read_if_stale().await;
        if result.is_err() {
            self.invalidate();
        }
        result
    }

    async fn read_if_stale(&self) -> Result<Arc<Value>, ProfileError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let fingerprint: Fingerprint = Sha256::digest(&raw).into();

        if let Some(value) = self.cached_if(&fingerprint) {
            return Ok(value);
        }

        let value: Value = serde_json::from_slice(&raw).map_err(|source| ProfileError::Invalid {
            path: self.path.clone(),
            source,
        })?;
        let value = Arc::new(value);

        debug!("Loaded profile from {}", self.path.display());
        if let Ok(mut slot) = self.cached.write() {
            *slot = Some(Cached {
                fingerprint,
                value: Arc::clone(&value),
            });
        }
        Ok(value)
    }

    fn cached_if(&self, fingerprint: &Fingerprint) -> Option<Arc<Value>> {
        let slot = self.cached.read().ok()?;
        slot.as_ref()
            .filter(|c| &c.fingerprint == fingerprint)
            .map(|c| Arc::clone(&c.value))
    }

    fn invalidate(&self) {
        if let Ok(mut slot) = self.cached.write() {
            *slot = None;
        }
    }

    fn io_error(&self, e: std::io::Error) -> ProfileError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProfileError::Missing(self.path.clone())
        } else {
            warn!("Profile file {} unreadable: {e}", self.path.display());
            ProfileError::Unreadable {
                path: self.path.clone(),
                source: e,
            }
        }
    }
}
