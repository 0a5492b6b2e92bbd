//! Key/value persistence collaborators.
//!
//! The store treats persistence as a localStorage-style sink: three named
//! records, each a JSON array, written fire-and-forget and read back once at
//! startup. Backends are swappable through the `Storage` trait; the default
//! backend is one file per record under `~/.secondbrain`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

pub const TASKS_KEY: &str = "secondbrain_tasks";
pub const SCHEDULES_KEY: &str = "secondbrain_schedules";
pub const LOGS_KEY: &str = "secondbrain_logs";

/// Load/save contract the store persists through. Implementations must be
/// callable from the background flush tasks, hence `Send + Sync`.
pub trait Storage: Send + Sync {
    /// Returns the stored payload for `key`, or `None` if nothing was ever
    /// written.
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, payload: &str) -> Result<()>;
}

/// One JSON file per record under a data directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default data directory, `$HOME/.secondbrain`.
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".secondbrain")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let payload = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(payload))
    }

    fn save(&self, key: &str, payload: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, payload).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// In-memory backend for tests. Counts saves per key so debounce behavior
/// can be asserted.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
    save_counts: Mutex<HashMap<String, usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self, key: &str) -> usize {
        self.save_counts
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, payload: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), payload.to_string());
        *self
            .save_counts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0) += 1;
        Ok(())
    }
}
