//! Element-scoped persistence over a [`Backend`]
//!
//! Keys for an element with identifier `id`:
//!
//! - `id/category`: index, a JSON array of the property names saved
//! - `id/category/prop`: one saved value
//!
//! Element operations are gated on the [`CONNECTED_KEY`] sentinel. While it
//! is absent they do nothing; a backend failure reading it is an error.

use super::{Backend, StorageError};
use crate::Value;

/// Sentinel key marking storage as enabled
pub const CONNECTED_KEY: &str = "trellis/connected";

/// Key/value adapter with element persistence
#[derive(Debug, Clone)]
pub struct StorageAdapter<B: Backend> {
    backend: B,
}

impl<B: Backend> StorageAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Enable element persistence
    pub fn connect(&self) -> Result<(), StorageError> {
        self.backend.set(CONNECTED_KEY, &Value::Bool(true))
    }

    pub fn disconnect(&self) -> Result<(), StorageError> {
        self.backend.delete(CONNECTED_KEY)
    }

    /// Whether the sentinel is present and truthy. A backend error counts
    /// as disconnected here; element operations propagate it instead.
    pub fn is_connected(&self) -> bool {
        self.connected().unwrap_or_else(|err| {
            tracing::warn!(%err, "cannot read storage sentinel");
            false
        })
    }

    fn connected(&self) -> Result<bool, StorageError> {
        Ok(self.backend.get(CONNECTED_KEY)?.is_some_and(|value| value.truthy()))
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.backend.get(key)
    }

    pub fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.backend.set(key, value)
    }

    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.backend.delete(key)
    }

    /// Remove every key, the sentinel included
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.clear()
    }

    /// Persist `props` for element `id` under `category`, merging the
    /// names into the existing index
    pub fn save(&self, id: &str, category: &str, props: &[(&str, Value)]) -> Result<(), StorageError> {
        if !self.gate("save", id)? {
            return Ok(());
        }

        let index_key = index_key(id, category);
        let mut names = self.read_index(&index_key)?;
        for (name, value) in props {
            self.backend.set(&value_key(id, category, name), value)?;
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }

        let index = Value::Array(names.into_iter().map(Value::from).collect());
        self.backend.set(&index_key, &index)?;
        tracing::debug!(id, category, count = props.len(), "saved element properties");
        Ok(())
    }

    /// Load the properties saved for element `id` under `category`, in index
    /// order. Names whose value is missing are skipped.
    ///
    /// # Panics
    ///
    /// If the index or a value holds malformed JSON.
    pub fn load(&self, id: &str, category: &str) -> Result<Vec<(String, Value)>, StorageError> {
        if !self.gate("load", id)? {
            return Ok(Vec::new());
        }

        let mut props = Vec::new();
        for name in self.read_index(&index_key(id, category))? {
            let key = value_key(id, category, &name);
            match self.backend.get(&key) {
                Ok(Some(value)) => props.push((name, value)),
                Ok(None) => tracing::warn!(key, "indexed property has no stored value"),
                Err(StorageError::Json(err)) => corrupt(&key, &err),
                Err(err) => return Err(err),
            }
        }
        Ok(props)
    }

    /// Delete every saved property of element `id` in `categories`, then the
    /// index entries
    ///
    /// # Panics
    ///
    /// If the sentinel, an index or a delete fails; a half-cleared element
    /// would leave a dangling index.
    pub fn clear_element(&self, id: &str, categories: &[&str]) {
        match self.gate("clear", id) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => panic!("clear_element: cannot read {CONNECTED_KEY}: {err}"),
        }

        for category in categories {
            let index_key = index_key(id, category);
            let names = match self.read_index(&index_key) {
                Ok(names) => names,
                Err(err) => panic!("clear_element: cannot read {index_key}: {err}"),
            };
            for name in names {
                let key = value_key(id, category, &name);
                if let Err(err) = self.backend.delete(&key) {
                    panic!("clear_element: cannot delete {key}: {err}");
                }
            }
        }
        for category in categories {
            let index_key = index_key(id, category);
            if let Err(err) = self.backend.delete(&index_key) {
                panic!("clear_element: cannot delete {index_key}: {err}");
            }
        }
        tracing::debug!(id, "cleared element storage");
    }

    /// `Ok(false)` only when the sentinel is absent or falsy
    fn gate(&self, op: &str, id: &str) -> Result<bool, StorageError> {
        let connected = self.connected()?;
        if !connected {
            tracing::warn!(op, id, "storage disconnected, skipping");
        }
        Ok(connected)
    }

    fn read_index(&self, key: &str) -> Result<Vec<String>, StorageError> {
        match self.backend.get(key) {
            Ok(None) => Ok(Vec::new()),
            Ok(Some(Value::Array(names))) => Ok(names.iter().map(Value::string).collect()),
            Ok(Some(other)) => panic!(
                "storage index {key} is not an array (found {}); reinitialize the store",
                other.type_of()
            ),
            Err(StorageError::Json(err)) => corrupt(key, &err),
            Err(err) => Err(err),
        }
    }
}

fn corrupt(key: &str, err: &serde_json::Error) -> ! {
    panic!("malformed JSON stored at {key} ({err}); reinitialize the store")
}

fn index_key(id: &str, category: &str) -> String {
    format!("{id}/{category}")
}

fn value_key(id: &str, category: &str, name: &str) -> String {
    format!("{id}/{category}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SyncBackend;

    fn connected() -> StorageAdapter<SyncBackend> {
        let adapter = StorageAdapter::new(SyncBackend::session());
        adapter.connect().unwrap();
        adapter
    }

    #[test]
    fn test_connect_and_disconnect() {
        let adapter = StorageAdapter::new(SyncBackend::session());
        assert!(!adapter.is_connected());
        adapter.connect().unwrap();
        assert!(adapter.is_connected());
        adapter.disconnect().unwrap();
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_save_writes_index_and_values() {
        let adapter = connected();
        adapter
            .save("counter", "state", &[("count", Value::from(3)), ("label", Value::from("clicks"))])
            .unwrap();

        let storage = adapter.backend().storage().lock().unwrap();
        assert_eq!(storage.get_item("counter/state"), Some(r#"["count","label"]"#));
        assert_eq!(storage.get_item("counter/state/count"), Some("3"));
        assert_eq!(storage.get_item("counter/state/label"), Some("\"clicks\""));
    }

    #[test]
    fn test_save_merges_index() {
        let adapter = connected();
        adapter.save("el", "props", &[("a", Value::from(1))]).unwrap();
        adapter
            .save("el", "props", &[("b", Value::from(2)), ("a", Value::from(10))])
            .unwrap();

        let loaded = adapter.load("el", "props").unwrap();
        assert_eq!(
            loaded,
            vec![("a".to_string(), Value::from(10)), ("b".to_string(), Value::from(2))]
        );
    }

    #[test]
    fn test_load_skips_missing_values() {
        let adapter = connected();
        adapter.save("el", "props", &[("a", Value::from(1)), ("b", Value::from(2))]).unwrap();
        adapter.delete("el/props/a").unwrap();

        assert_eq!(adapter.load("el", "props").unwrap(), vec![("b".to_string(), Value::from(2))]);
    }

    #[test]
    fn test_disconnected_is_noop() {
        let adapter = StorageAdapter::new(SyncBackend::session());
        adapter.save("el", "props", &[("a", Value::from(1))]).unwrap();
        assert_eq!(adapter.backend().storage().lock().unwrap().length(), 0);
        assert!(adapter.load("el", "props").unwrap().is_empty());
        adapter.clear_element("el", &["props"]);
    }

    #[test]
    fn test_clear_element() {
        let adapter = connected();
        adapter.save("el", "props", &[("a", Value::from(1))]).unwrap();
        adapter.save("el", "style", &[("color", Value::from("red"))]).unwrap();
        adapter.save("other", "props", &[("a", Value::from(2))]).unwrap();

        adapter.clear_element("el", &["props", "style"]);

        assert_eq!(adapter.get("el/props").unwrap(), None);
        assert_eq!(adapter.get("el/style/color").unwrap(), None);
        assert_eq!(adapter.load("other", "props").unwrap().len(), 1);
        assert!(adapter.is_connected());
    }

    #[test]
    #[should_panic(expected = "reinitialize")]
    fn test_load_malformed_index_panics() {
        let adapter = connected();
        adapter
            .backend()
            .storage()
            .lock()
            .unwrap()
            .set_item("el/props", "[\"a\"")
            .unwrap();
        let _ = adapter.load("el", "props");
    }

    #[test]
    #[should_panic(expected = "reinitialize")]
    fn test_load_non_array_index_panics() {
        let adapter = connected();
        adapter.set("el/props", &Value::from(5)).unwrap();
        let _ = adapter.load("el", "props");
    }

    #[test]
    fn test_offline_backend_is_an_error_not_disconnected() {
        use crate::storage::{AsyncBackend, AsyncStore};

        let store = AsyncStore::new();
        let adapter = StorageAdapter::new(AsyncBackend::new(store.clone()));
        adapter.connect().unwrap();
        store.set_offline(true);

        assert!(matches!(
            adapter.save("card", "props", &[("title", Value::from("Hi"))]),
            Err(StorageError::Promise(_))
        ));
        assert!(adapter.load("card", "props").is_err());
        assert!(!adapter.is_connected());
    }

    #[test]
    #[should_panic(expected = "clear_element")]
    fn test_clear_element_panics_on_offline_backend() {
        use crate::storage::{AsyncBackend, AsyncStore};

        let store = AsyncStore::new();
        let adapter = StorageAdapter::new(AsyncBackend::new(store.clone()));
        adapter.connect().unwrap();
        store.set_offline(true);
        adapter.clear_element("card", &["props"]);
    }
}
