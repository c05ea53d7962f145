//! Flat string key-value substrates that stage records are persisted into.

use crate::error::StoreError;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Synchronous string-keyed, string-valued storage.
///
/// Reads never fail; writes may be refused by the backing storage and the
/// error is handed back to the caller untouched.
pub trait Substrate: Send + Sync {
    /// Fetch the value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Key at enumeration position `index`.
    fn key(&self, index: usize) -> Option<String>;

    /// Number of stored keys.
    fn len(&self) -> usize;

    /// Whether the substrate holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every key, in enumeration order.
    fn keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|index| self.key(index)).collect()
    }
}

/// Session-scoped in-memory substrate; entries live as long as the value.
///
/// Enumeration follows insertion order. An optional quota bounds the total
/// byte size of keys plus values.
#[derive(Debug, Default)]
pub struct MemorySubstrate {
    entries: RwLock<Vec<(String, String)>>,
    quota: Option<usize>,
}

impl MemorySubstrate {
    /// Create an unbounded substrate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a substrate that refuses writes beyond `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            quota: Some(quota),
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Substrate for MemorySubstrate {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let position = entries.iter().position(|(existing, _)| existing == key);
        if let Some(limit) = self.quota {
            let used: usize = entries
                .iter()
                .enumerate()
                .filter(|(index, _)| Some(*index) != position)
                .map(|(_, (k, v))| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    limit,
                });
            }
        }
        match position {
            Some(index) => entries[index].1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().retain(|(existing, _)| existing != key);
        Ok(())
    }

    fn key(&self, index: usize) -> Option<String> {
        self.entries.read().get(index).map(|(key, _)| key.clone())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Substrate persisted as a single JSON object file.
///
/// Every mutation rewrites the file through a temporary sibling and a rename.
/// Enumeration follows key order.
#[derive(Debug)]
pub struct FileSubstrate {
    /// Location of the JSON file.
    path: PathBuf,
    /// Cached file contents.
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSubstrate {
    /// Open the substrate at `path`, starting empty when the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        info!(
            "opened file substrate (path={}, entries={})",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used while rewriting.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Rewrite the backing file atomically.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let contents = serde_json::to_string_pretty(entries)?;
            file.write_all(contents.as_bytes())?;
        }
        fs::rename(temp_path, &self.path)?;
        debug!(
            "persisted file substrate (path={}, entries={})",
            self.path.display(),
            entries.len()
        );
        Ok(())
    }
}

impl Substrate for FileSubstrate {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn key(&self, index: usize) -> Option<String> {
        self.entries.lock().keys().nth(index).cloned()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSubstrate, MemorySubstrate, Substrate};
    use crate::error::StoreError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn memory_substrate_keeps_insertion_order() {
        let substrate = MemorySubstrate::new();
        substrate.set_item("b", "1").expect("set b");
        substrate.set_item("a", "2").expect("set a");
        substrate.set_item("b", "3").expect("overwrite b");

        assert_eq!(substrate.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(substrate.get_item("b"), Some("3".to_string()));
        assert_eq!(substrate.len(), 2);

        substrate.remove_item("b").expect("remove");
        substrate.remove_item("b").expect("remove twice");
        assert_eq!(substrate.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn memory_substrate_enforces_quota() {
        let substrate = MemorySubstrate::with_quota(8);
        substrate.set_item("k", "1234").expect("fits");
        substrate.set_item("k", "1234567").expect("replacement fits");

        let err = substrate.set_item("j", "12").expect_err("over quota");
        match err {
            StoreError::QuotaExceeded { key, limit } => {
                assert_eq!(key, "j");
                assert_eq!(limit, 8);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(substrate.get_item("j"), None);
    }

    #[test]
    fn file_substrate_persists_across_reopen() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("sessions.json");

        let substrate = FileSubstrate::open(&path).expect("open");
        assert!(substrate.is_empty());
        substrate.set_item("outline_1", "{}").expect("set");
        substrate.set_item("ppt_1", "{}").expect("set");
        substrate.remove_item("outline_1").expect("remove");
        substrate.remove_item("missing").expect("remove missing");

        let reopened = FileSubstrate::open(&path).expect("reopen");
        assert_eq!(reopened.keys(), vec!["ppt_1".to_string()]);
        assert_eq!(reopened.get_item("ppt_1"), Some("{}".to_string()));
        assert!(!temp.path().join("nested").join("sessions.json.tmp").exists());
    }

    #[test]
    fn file_substrate_rejects_corrupt_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("sessions.json");
        std::fs::write(&path, "not-json").expect("write");

        let err = FileSubstrate::open(&path).expect_err("corrupt");
        assert!(matches!(err, StoreError::Serde(_)));
    }
}
