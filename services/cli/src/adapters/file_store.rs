//! services/cli/src/adapters/file_store.rs
//!
//! A `KeyValueStore` persisted as one JSON object on disk. Every write rewrites
//! the file through a temporary sibling and a rename, so a batch lands whole or
//! not at all.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sage_core::ports::{KeyValueStore, PortError, PortResult, WriteOp};
use tracing::{debug, warn};

pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file starts empty; so does an
    /// unreadable one, after a warning.
    pub fn open(path: impl AsRef<Path>) -> PortResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed state file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        debug!("Opened state file {} with {} keys", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Applies `change` to a copy of the entries, persists it, then keeps it.
    fn update<F>(&self, change: F) -> PortResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Unexpected("state lock poisoned".to_string()))?;
        let mut next = entries.clone();
        change(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, raw).map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)
    }
}

fn io_error(e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("failed to write state file: {e}"))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PortError::Unexpected("state lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn apply_batch(&self, ops: Vec<WriteOp>) -> PortResult<()> {
        self.update(|entries| {
            for op in ops {
                match op {
                    WriteOp::Set { key, value } => {
                        entries.insert(key, value);
                    }
                    WriteOp::Remove { key } => {
                        entries.remove(&key);
                    }
                }
            }
        })
    }
}
