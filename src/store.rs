//! Local persistence for shade proposals.
//!
//! A small string key-value layer (one file per key) with the proposal list
//! stored as JSON under a versioned key. Bumping the key version orphans the
//! old data; there is no migration.

use crate::proposal::Proposal;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Storage key for the proposal list
pub const PROPOSALS_KEY: &str = "shade_proposals_v1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// String key-value storage, the local equivalent of browser storage
pub trait KeyValueStore {
    /// Stored value, or `None` if absent or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Replace the value in a single overwrite
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: each key lives in `<dir>/<key>.json`.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the old value, so readers see either the previous or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key).ok()?;
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable store entry");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(path = %path.display(), bytes = value.len(), "store entry written");
        Ok(())
    }
}

/// Ordered proposal list (most recent first) on top of a key-value store
pub struct ProposalStore<S> {
    kv: S,
}

impl<S: KeyValueStore> ProposalStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// All proposals, most recent first.
    /// Missing or corrupt data reads as an empty list.
    pub fn list(&self) -> Vec<Proposal> {
        let Some(raw) = self.kv.get(PROPOSALS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "stored proposals are corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Prepend a proposal and persist the whole list
    pub fn add(&mut self, proposal: Proposal) -> Result<(), StoreError> {
        let mut list = self.list();
        list.insert(0, proposal);
        let raw = serde_json::to_string(&list)?;
        self.kv.set(PROPOSALS_KEY, &raw)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }
}
