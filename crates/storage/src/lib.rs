//! Durable key/value storage for small JSON documents.
//!
//! Keys are short slash-separated strings such as `loadout/police-sedan`.
//! Writes are synchronous and complete before the call returns.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("store lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore {
    /// Returns `Ok(None)` when nothing was ever written under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Keys are `/`-separated segments of ASCII letters, digits, `-`, `_` and
/// `.`; empty, `.` and `..` segments are rejected.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Stores each key as `<root>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write to a sibling file and rename so readers never see a torn record.
        let tmp = path.with_extension("json.tmp");
        let written = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            match fs::remove_file(&tmp) {
                Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                    warn!("could not remove {}: {cleanup}", tmp.display());
                }
                _ => {}
            }
            return Err(e.into());
        }
        debug!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, mostly useful for tests and tools.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.keys().cloned().collect())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get("loadout/nothing").unwrap().is_none());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.put("loadout/sedan", "{\"wheel\":2}").unwrap();
        assert_eq!(
            store.get("loadout/sedan").unwrap().as_deref(),
            Some("{\"wheel\":2}")
        );
        assert!(dir.path().join("loadout/sedan.json").exists());
        assert!(!dir.path().join("loadout/sedan.json.tmp").exists());
    }

    #[test]
    fn put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.put("a", "1").unwrap();
        store.put("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn remove_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.remove("gone").unwrap();
        store.put("gone", "x").unwrap();
        store.remove("gone").unwrap();
        assert!(store.get("gone").unwrap().is_none());
    }

    #[test]
    fn rejects_path_traversal() {
        let store = MemoryStore::new();
        for key in ["", "../escape", "a//b", "a/./b", "sp ace", "/abs"] {
            assert!(
                matches!(store.put(key, "x"), Err(StoreError::InvalidKey(_))),
                "{key:?} accepted"
            );
        }
    }

    #[test]
    fn memory_store_lists_keys() {
        let store = MemoryStore::new();
        store.put("loadout/b", "1").unwrap();
        store.put("loadout/a", "1").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["loadout/a", "loadout/b"]);
    }

    #[test]
    fn poisoned_memory_store_reports_errors() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.put("loadout/a", "1").unwrap();
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(matches!(store.keys(), Err(StoreError::Poisoned)));
        assert!(matches!(store.get("loadout/a"), Err(StoreError::Poisoned)));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // A directory in the record's place makes the rename fail.
        fs::create_dir_all(dir.path().join("loadout/sedan.json/occupied")).unwrap();
        assert!(matches!(
            store.put("loadout/sedan", "{}"),
            Err(StoreError::Io(_))
        ));
        assert!(!dir.path().join("loadout/sedan.json.tmp").exists());
    }
}
