//! The common backend contract and its three implementations

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{AsyncStore, StorageError, WebStorage, json};
use crate::{Promise, Value, await_promise};

/// A synchronous key/value backend
pub trait Backend: Send + Sync {
    /// `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

// ============================================================================
// Synchronous: Web Storage with JSON values
// ============================================================================

/// Pass-through to a [`WebStorage`], JSON-encoding values
#[derive(Debug, Clone)]
pub struct SyncBackend {
    storage: Arc<Mutex<WebStorage>>,
}

impl SyncBackend {
    pub fn new(storage: Arc<Mutex<WebStorage>>) -> Self {
        Self { storage }
    }

    /// Session-scoped, in memory
    pub fn session() -> Self {
        Self::new(Arc::new(Mutex::new(WebStorage::session())))
    }

    /// App-scoped, persisted to `path`
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(Mutex::new(WebStorage::local(path)?))))
    }

    pub fn storage(&self) -> &Arc<Mutex<WebStorage>> {
        &self.storage
    }

    fn lock(&self) -> MutexGuard<'_, WebStorage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for SyncBackend {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let text = self.lock().get_item(key).map(str::to_string);
        text.map(|text| json::parse(&text)).transpose()
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = json::stringify(value)?;
        self.lock().set_item(key, &text)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.lock().clear()
    }
}

// ============================================================================
// Asynchronous: AsyncStore through the promise bridge
// ============================================================================

/// Drives an [`AsyncStore`] synchronously by awaiting each operation
#[derive(Debug, Clone)]
pub struct AsyncBackend {
    store: AsyncStore,
    timeout: Option<Duration>,
}

impl AsyncBackend {
    /// Waits as long as each operation takes
    pub fn new(store: AsyncStore) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Gives up on an operation after `timeout`
    pub fn with_timeout(store: AsyncStore, timeout: Duration) -> Self {
        Self {
            store,
            timeout: Some(timeout),
        }
    }

    pub fn store(&self) -> &AsyncStore {
        &self.store
    }

    fn settle(&self, promise: Promise) -> Result<Value, StorageError> {
        let pending = await_promise(promise);
        let settlement = match self.timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        };
        Ok(settlement?)
    }
}

impl Backend for AsyncBackend {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let value = self.settle(self.store.get_item(key))?;
        Ok((!value.is_undefined()).then_some(value))
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.settle(self.store.set_item(key, value)).map(drop)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.settle(self.store.remove_item(key)).map(drop)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.settle(self.store.clear()).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromiseError;

    #[test]
    fn test_sync_backend_stores_json_text() {
        let backend = SyncBackend::session();
        backend.set("n", &Value::from(2.5)).unwrap();

        assert_eq!(backend.storage().lock().unwrap().get_item("n"), Some("2.5"));
        assert_eq!(backend.get("n").unwrap(), Some(Value::from(2.5)));
        assert_eq!(backend.get("missing").unwrap(), None);
    }

    #[test]
    fn test_sync_backend_malformed() {
        let backend = SyncBackend::session();
        backend.storage().lock().unwrap().set_item("bad", "{").unwrap();
        assert!(matches!(backend.get("bad"), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_async_backend_rejection_is_error() {
        let store = AsyncStore::new();
        store.set_offline(true);
        let backend = AsyncBackend::new(store);
        assert!(matches!(
            backend.set("k", &Value::Null),
            Err(StorageError::Promise(PromiseError::Rejected(_)))
        ));
    }

    #[test]
    fn test_async_backend_timeout() {
        let backend = AsyncBackend::with_timeout(
            AsyncStore::with_latency(Duration::from_millis(500)),
            Duration::from_millis(10),
        );
        assert!(matches!(
            backend.get("k"),
            Err(StorageError::Promise(PromiseError::TimedOut(_)))
        ));
    }

    #[test]
    fn test_boxed_backend() {
        let backend: Box<dyn Backend> = Box::new(SyncBackend::session());
        backend.set("k", &Value::Bool(true)).unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(Value::Bool(true)));
    }
}
