//! Web Storage
//!
//! sessionStorage (in memory) and app-scoped localStorage (persisted to a
//! JSON file on every write).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::StorageError;

/// String key/value store with the Web Storage surface
#[derive(Debug, Default)]
pub struct WebStorage {
    data: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl WebStorage {
    /// Create in-memory storage (sessionStorage)
    pub fn session() -> Self {
        Self::default()
    }

    /// Open persistent storage (localStorage) backed by `path`. A missing
    /// file starts empty.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), items = data.len(), "opened local storage");
        Ok(Self {
            data,
            path: Some(path),
        })
    }

    /// Backing file, if persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.data.insert(key.to_string(), value.to_string());
        self.persist()
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if self.data.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.data.clear();
        self.persist()
    }

    /// Key at `index`, in key order
    pub fn key(&self, index: usize) -> Option<&str> {
        self.data.keys().nth(index).map(String::as_str)
    }

    /// Number of items
    pub fn length(&self) -> usize {
        self.data.len()
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_string(&self.data)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_storage() {
        let mut storage = WebStorage::session();

        storage.set_item("key1", "value1").unwrap();
        assert_eq!(storage.get_item("key1"), Some("value1"));

        storage.set_item("key2", "value2").unwrap();
        assert_eq!(storage.length(), 2);
        assert_eq!(storage.key(1), Some("key2"));

        storage.remove_item("key1").unwrap();
        assert_eq!(storage.get_item("key1"), None);

        storage.clear().unwrap();
        assert_eq!(storage.length(), 0);
        assert_eq!(storage.key(0), None);
    }

    #[test]
    fn test_local_storage_persists() {
        let path = std::env::temp_dir().join(format!("trellis-web-storage-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        {
            let mut storage = WebStorage::local(&path).unwrap();
            storage.set_item("theme", "\"dark\"").unwrap();
        }
        let storage = WebStorage::local(&path).unwrap();
        assert_eq!(storage.get_item("theme"), Some("\"dark\""));
        assert_eq!(storage.path(), Some(path.as_path()));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_local_storage_rejects_corrupt_file() {
        let path = std::env::temp_dir().join(format!("trellis-web-storage-bad-{}.json", std::process::id()));
        fs::write(&path, "not json").unwrap();
        assert!(matches!(WebStorage::local(&path), Err(StorageError::Json(_))));
        fs::remove_file(&path).unwrap();
    }
}
