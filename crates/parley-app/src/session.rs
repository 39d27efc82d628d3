//! Durable current-user slot that survives restarts of the terminal client.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use parley_types::User;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

pub const CURRENT_USER_KEY: &str = "parley-currentUser";

/// Opaque string key-value slot
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// JSON object on disk, rewritten in full on every change
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_raw(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        Ok(Some(raw).filter(|r| !r.trim().is_empty()))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match self.read_raw()? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt session file {}", self.path.display())),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Current entries before a rewrite. A corrupt file is replaced, I/O errors propagate.
    fn read_for_update(&self) -> Result<BTreeMap<String, String>> {
        let Some(raw) = self.read_raw()? else {
            return Ok(BTreeMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Discarding corrupt session file {}: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_for_update()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// The remembered user, or `None` when nothing usable is stored
pub fn load_current_user(store: &dyn SessionStore) -> Option<User> {
    let raw = match store.get(CURRENT_USER_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::error!("Error reading session key {}: {:#}", CURRENT_USER_KEY, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::error!("Error reading session key {}: {}", CURRENT_USER_KEY, e);
            None
        }
    }
}

pub fn save_current_user(store: &dyn SessionStore, user: &User) -> Result<()> {
    let raw = serde_json::to_string(user)?;
    store.set(CURRENT_USER_KEY, &raw)
}

pub fn clear_current_user(store: &dyn SessionStore) -> Result<()> {
    store.delete(CURRENT_USER_KEY)
}
