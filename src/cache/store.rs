//! Filesystem cache store
//!
//! Entries live under `<root>/<key>/` with a JSON manifest describing the
//! persisted paths. Writes go to a staging directory first and are renamed
//! into place, and same-key operations are serialized through a per-key
//! async lock, so a concurrent restore never observes a partial entry.
//! Saves are last-writer-wins; saving identical content twice is a no-op
//! effect-wise.

use crate::cache::key::CacheKey;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const MANIFEST: &str = "manifest.json";

/// One persisted path inside a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    /// Slot directory name under the entry
    slot: String,
    /// Path as declared by the cache policy, workspace-relative or absolute
    path: PathBuf,
}

/// Shared store for environment snapshots, keyed by derived cache keys
pub struct CacheStore {
    root: PathBuf,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheStore {
    /// Open (and create) a store rooted at `root`
    pub fn new(root: PathBuf) -> EngineResult<Self> {
        std::fs::create_dir_all(&root)
            .map_err(|e| EngineError::Cache(format!("cannot create cache root: {}", e)))?;
        Ok(Self {
            root,
            locks: StdMutex::new(HashMap::new()),
        })
    }

    /// Store under the user's cache directory
    pub fn with_default_root() -> EngineResult<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("conveyor").join("cache"))
    }

    fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(key.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Whether an entry exists for the key
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_dir(key).join(MANIFEST).is_file()
    }

    /// Persist `paths` (resolved against `workdir`) under `key`, replacing
    /// any existing entry. A declared path that does not exist on disk is
    /// skipped with a warning rather than failing the job.
    pub async fn save(
        &self,
        key: &CacheKey,
        workdir: &Path,
        paths: &[PathBuf],
    ) -> EngineResult<()> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let staging = self.root.join(format!(".stage-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&staging)
            .map_err(|e| EngineError::Cache(format!("cannot create staging dir: {}", e)))?;

        let mut manifest = Vec::new();
        for (index, declared) in paths.iter().enumerate() {
            let source = resolve(workdir, declared);
            if !source.exists() {
                warn!(path = %source.display(), "cache path missing, skipping");
                continue;
            }
            let slot = index.to_string();
            copy_recursive(&source, &staging.join(&slot))
                .map_err(|e| EngineError::Cache(format!("cache save failed: {}", e)))?;
            manifest.push(ManifestEntry {
                slot,
                path: declared.clone(),
            });
        }

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| EngineError::Cache(format!("manifest serialization failed: {}", e)))?;
        std::fs::write(staging.join(MANIFEST), json)
            .map_err(|e| EngineError::Cache(format!("manifest write failed: {}", e)))?;

        // Replace-then-rename under the per-key lock: restores serialized on
        // the same lock can never see the gap or a half-written entry.
        let entry = self.entry_dir(key);
        if entry.exists() {
            std::fs::remove_dir_all(&entry)
                .map_err(|e| EngineError::Cache(format!("cannot replace cache entry: {}", e)))?;
        }
        std::fs::rename(&staging, &entry)
            .map_err(|e| EngineError::Cache(format!("cache entry rename failed: {}", e)))?;

        debug!(key = %key, "cache saved");
        Ok(())
    }

    /// Restore the entry for `key` into `workdir`. A miss returns `None` and
    /// is never an error: the job proceeds with cold state.
    pub async fn restore(
        &self,
        key: &CacheKey,
        workdir: &Path,
    ) -> EngineResult<Option<Vec<PathBuf>>> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let entry = self.entry_dir(key);
        let manifest_path = entry.join(MANIFEST);
        if !manifest_path.is_file() {
            debug!(key = %key, "cache miss");
            return Ok(None);
        }

        let json = std::fs::read_to_string(&manifest_path)
            .map_err(|e| EngineError::Cache(format!("manifest read failed: {}", e)))?;
        let manifest: Vec<ManifestEntry> = serde_json::from_str(&json)
            .map_err(|e| EngineError::Cache(format!("manifest parse failed: {}", e)))?;

        let mut restored = Vec::new();
        for item in &manifest {
            let dest = resolve(workdir, &item.path);
            if dest.exists() {
                if dest.is_dir() {
                    std::fs::remove_dir_all(&dest)
                } else {
                    std::fs::remove_file(&dest)
                }
                .map_err(|e| EngineError::Cache(format!("cache restore failed: {}", e)))?;
            }
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| EngineError::Cache(format!("cache restore failed: {}", e)))?;
            }
            copy_recursive(&entry.join(&item.slot), &dest)
                .map_err(|e| EngineError::Cache(format!("cache restore failed: {}", e)))?;
            restored.push(item.path.clone());
        }

        debug!(key = %key, paths = restored.len(), "cache restored");
        Ok(Some(restored))
    }
}

fn resolve(workdir: &Path, declared: &Path) -> PathBuf {
    if declared.is_absolute() {
        declared.to_path_buf()
    } else {
        workdir.join(declared)
    }
}

fn copy_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    if from.is_dir() {
        std::fs::create_dir_all(to)?;
        for entry in std::fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from, to)?;
    }
    Ok(())
}
