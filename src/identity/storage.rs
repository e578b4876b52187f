use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Storage key holding the opaque authentication token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the signed-in user's email.
pub const USER_KEY: &str = "useremail";

/// Tab-scoped key/value storage backing the credential store.
///
/// Writes are infallible from the caller's point of view: a backend that
/// persists somewhere keeps its in-memory view authoritative and only logs
/// when the durable copy cannot be updated. Clearing credentials must never
/// fail halfway.
pub trait SessionStorage: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
    fn remove_item(&mut self, key: &str);
    fn clear(&mut self);
}

/// Lives exactly as long as the process (the "lost on reload" variant).
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> { self.items.get(key).cloned() }
    fn set_item(&mut self, key: &str, value: String) { self.items.insert(key.to_string(), value); }
    fn remove_item(&mut self, key: &str) { self.items.remove(key); }
    fn clear(&mut self) { self.items.clear(); }
}

/// JSON object on disk; survives a console restart the way tab storage
/// survives a page reload.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl JsonFileStorage {
    /// Open (or lazily create) the storage file. A missing, empty or unparsable
    /// file is an empty store, i.e. signed out.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let raw = std::fs::read(&path)
                .with_context(|| format!("Failed to read session file {}", path.display()))?;
            if raw.iter().all(|b| b.is_ascii_whitespace()) {
                BTreeMap::new()
            } else {
                match serde_json::from_slice::<BTreeMap<String, String>>(&raw) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(target: "session", "session file {} is unreadable ({}); starting signed out", path.display(), e);
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf { self.path.with_extension("json.tmp") }

    /// Write a sibling temp file and rename it over the original, so a crash
    /// mid-write leaves either the old or the new contents.
    fn persist(&self) {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    warn!(target: "session", "session storage directory {} could not be created: {}", dir.display(), e);
                }
            }
        }
        let bytes = match serde_json::to_vec_pretty(&self.items) {
            Ok(b) => b,
            Err(e) => { warn!(target: "session", "session storage encode failed: {}", e); return; }
        };
        let tmp = self.tmp_path();
        if let Err(e) = std::fs::write(&tmp, bytes) {
            warn!(target: "session", "session storage write to {} failed: {}", tmp.display(), e);
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(target: "session", "session storage rename to {} failed: {}", self.path.display(), e);
            let _ = std::fs::remove_file(&tmp);
        }
    }
}

impl SessionStorage for JsonFileStorage {
    fn get_item(&self, key: &str) -> Option<String> { self.items.get(key).cloned() }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
        self.persist();
    }

    fn remove_item(&mut self, key: &str) {
        if self.items.remove(key).is_some() {
            self.persist();
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }
}
