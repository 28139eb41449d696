//! Asynchronous bulk store
//!
//! An offline-capable object store in the style of IndexedDB: values are
//! structured-cloned in as JSON, and every operation returns a [`Promise`]
//! settled from a task on the smol executor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use smol::Timer;

use super::json;
use crate::{Promise, Resolver, StringMap, Value};

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<String, serde_json::Value>,
    offline: bool,
}

/// Asynchronous key/value store
#[derive(Debug, Clone, Default)]
pub struct AsyncStore {
    state: Arc<Mutex<StoreState>>,
    latency: Duration,
}

impl AsyncStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose operations settle after `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// While offline every operation rejects
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves with the stored value, or `undefined` when absent
    pub fn get_item(&self, key: &str) -> Promise {
        let key = key.to_string();
        self.run(move |state| Ok(state.records.get(&key).cloned().map_or(Value::Undefined, json::from_json)))
    }

    /// Resolves with `undefined` once stored. Rejects with a
    /// `DataCloneError` for values without a JSON form.
    pub fn set_item(&self, key: &str, value: &Value) -> Promise {
        let key = key.to_string();
        let record = json::to_json(value).map_err(|err| error("DataCloneError", &err.to_string()));
        self.run(move |state| {
            state.records.insert(key, record?);
            Ok(Value::Undefined)
        })
    }

    pub fn remove_item(&self, key: &str) -> Promise {
        let key = key.to_string();
        self.run(move |state| {
            state.records.remove(&key);
            Ok(Value::Undefined)
        })
    }

    pub fn clear(&self) -> Promise {
        self.run(|state| {
            state.records.clear();
            Ok(Value::Undefined)
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run<F>(&self, op: F) -> Promise
    where
        F: FnOnce(&mut StoreState) -> Result<Value, Value> + Send + 'static,
    {
        let (promise, resolver) = Promise::new();
        let state = self.state.clone();
        let latency = self.latency;

        smol::spawn(async move {
            if !latency.is_zero() {
                Timer::after(latency).await;
            }
            let result = {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if state.offline {
                    Err(error("InvalidStateError", "store is offline"))
                } else {
                    op(&mut state)
                }
            };
            settle(&resolver, result);
        })
        .detach();

        promise
    }
}

fn settle(resolver: &Resolver, result: Result<Value, Value>) {
    match result {
        Ok(value) => resolver.resolve(value),
        Err(reason) => resolver.reject(reason),
    };
}

/// A DOMException-like rejection payload
fn error(name: &str, message: &str) -> Value {
    let mut map = StringMap::new();
    map.insert("name", name);
    map.insert("message", message);
    Value::StringMap(map)
}
