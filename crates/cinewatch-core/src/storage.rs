use cinewatch_config::{HistoryConfig, PathManager};
use cinewatch_models::HistoryState;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use crate::error::StoreError;
use crate::migration;

/// Durable home of the history record
pub trait HistoryStorage {
    /// Load the persisted state, or `None` when nothing usable is stored
    fn load(&mut self) -> Result<Option<HistoryState>, StoreError>;

    fn save(&mut self, state: &HistoryState) -> Result<(), StoreError>;
}

/// JSON file on local disk, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_paths(path_manager: &PathManager, config: &HistoryConfig) -> Self {
        Self::new(path_manager.history_file(&config.storage_file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn backup_incompatible(&self, reason: &dyn std::fmt::Display) {
        let backup_path = self.path.with_extension("json.bak");
        if let Err(backup_err) = std::fs::copy(&self.path, &backup_path) {
            warn!(
                "Failed to backup unreadable history file: {}. Starting with empty history.",
                backup_err
            );
        } else {
            warn!(
                "History file unreadable ({}). Backed up to {:?} and starting with empty history.",
                reason, backup_path
            );
        }
    }
}

impl HistoryStorage for JsonFileStorage {
    fn load(&mut self) -> Result<Option<HistoryState>, StoreError> {
        if !self.exists() {
            debug!("History file {:?} does not exist, starting empty", self.path);
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                self.backup_incompatible(&e);
                return Ok(None);
            }
        };

        match migration::decode(value) {
            Ok(state) => {
                info!(
                    "Loaded history: {} entries, trailer {}",
                    state.continue_watching.len(),
                    if state.last_watched_trailer.is_some() { "cached" } else { "absent" }
                );
                Ok(Some(state))
            }
            Err(e) => {
                self.backup_incompatible(&e);
                Ok(None)
            }
        }
    }

    fn save(&mut self, state: &HistoryState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(&migration::encode(state)?)?;

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, json).map_err(|e| StoreError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        debug!("Saved history: {} entries to {:?}", state.continue_watching.len(), self.path);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    value: Option<Value>,
    fail_writes: bool,
    saves: usize,
}

/// In-process storage keeping the encoded envelope.
///
/// Clones share the same slot, so a test can keep a handle, hand another to
/// a store and later reopen from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with a raw persisted envelope
    pub fn with_value(value: Value) -> Self {
        let storage = Self::new();
        storage.lock().value = Some(value);
        storage
    }

    /// Raw envelope as last written
    pub fn value(&self) -> Option<Value> {
        self.lock().value.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Make subsequent saves fail, mimicking a full or read-only disk
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&mut self) -> Result<Option<HistoryState>, StoreError> {
        match self.value() {
            Some(value) => Ok(Some(migration::decode(value)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, state: &HistoryState) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StoreError::Unavailable("memory storage is read-only".to_string()));
        }
        inner.value = Some(migration::encode(state)?);
        inner.saves += 1;
        Ok(())
    }
}
