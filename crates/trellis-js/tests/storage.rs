//! Storage round trips over every backend, and element persistence

use std::path::PathBuf;
use std::time::Duration;

use trellis_js::storage::{AsyncBackend, AsyncStore, Backend, StorageAdapter, SyncBackend};
use trellis_js::{StringMap, Value};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("trellis-{name}-{}.json", std::process::id()))
}

fn samples() -> Vec<Value> {
    let mut map = StringMap::new();
    map.insert("theme", "dark");
    map.insert("lang", "en");

    vec![
        Value::Null,
        Value::Bool(false),
        Value::from(42),
        Value::from(-0.5),
        Value::from("text with \"quotes\""),
        Value::StringMap(map),
        Value::Array(vec![Value::from(1), Value::from("two"), Value::Null]),
    ]
}

fn assert_round_trips<B: Backend>(adapter: &StorageAdapter<B>) {
    for (i, value) in samples().into_iter().enumerate() {
        let key = format!("k{i}");
        adapter.set(&key, &value).unwrap();
        assert_eq!(adapter.get(&key).unwrap(), Some(value), "key {key}");
    }

    adapter.delete("k0").unwrap();
    assert_eq!(adapter.get("k0").unwrap(), None);
    adapter.clear().unwrap();
    assert_eq!(adapter.get("k1").unwrap(), None);
}

#[test]
fn test_session_round_trip() {
    assert_round_trips(&StorageAdapter::new(SyncBackend::session()));
}

#[test]
fn test_local_round_trip() {
    let path = temp_path("local-round-trip");
    let _ = std::fs::remove_file(&path);

    assert_round_trips(&StorageAdapter::new(SyncBackend::local(&path).unwrap()));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_async_round_trip() {
    let store = AsyncStore::with_latency(Duration::from_millis(2));
    assert_round_trips(&StorageAdapter::new(AsyncBackend::new(store)));
}

#[test]
fn test_unserializable_values_are_rejected() {
    let adapter = StorageAdapter::new(SyncBackend::session());
    assert!(adapter.set("k", &Value::Undefined).is_err());

    let adapter = StorageAdapter::new(AsyncBackend::new(AsyncStore::new()));
    assert!(adapter.set("k", &Value::Undefined).is_err());
    assert_eq!(adapter.get("k").unwrap(), None);
}

#[test]
fn test_local_storage_survives_reopen() {
    let path = temp_path("local-reopen");
    let _ = std::fs::remove_file(&path);

    {
        let adapter = StorageAdapter::new(SyncBackend::local(&path).unwrap());
        adapter.connect().unwrap();
        adapter.save("todo-1", "props", &[("done", Value::Bool(true))]).unwrap();
    }

    let adapter = StorageAdapter::new(SyncBackend::local(&path).unwrap());
    assert!(adapter.is_connected());
    assert_eq!(
        adapter.load("todo-1", "props").unwrap(),
        vec![("done".to_string(), Value::Bool(true))]
    );

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_element_persistence_on_async_backend() {
    let adapter = StorageAdapter::new(AsyncBackend::new(AsyncStore::new()));
    adapter.connect().unwrap();

    adapter
        .save("card", "props", &[("title", Value::from("Hi")), ("count", Value::from(2))])
        .unwrap();
    assert_eq!(adapter.load("card", "props").unwrap().len(), 2);

    adapter.clear_element("card", &["props"]);
    assert!(adapter.load("card", "props").unwrap().is_empty());
    assert_eq!(adapter.backend().store().len(), 1);
}

#[test]
fn test_disconnected_adapter_ignores_elements() {
    let adapter = StorageAdapter::new(AsyncBackend::new(AsyncStore::new()));
    adapter.save("card", "props", &[("title", Value::from("Hi"))]).unwrap();
    assert!(adapter.backend().store().is_empty());
}

#[test]
#[should_panic(expected = "reinitialize")]
fn test_malformed_value_panics_on_load() {
    let adapter = StorageAdapter::new(SyncBackend::session());
    adapter.connect().unwrap();
    adapter.save("el", "props", &[("a", Value::from(1))]).unwrap();
    adapter
        .backend()
        .storage()
        .lock()
        .unwrap()
        .set_item("el/props/a", "{not json")
        .unwrap();

    let _ = adapter.load("el", "props");
}

#[test]
fn test_rejected_save_surfaces_as_error() {
    let store = AsyncStore::new();
    let adapter = StorageAdapter::new(AsyncBackend::new(store.clone()));
    adapter.connect().unwrap();
    adapter.save("card", "props", &[("title", Value::from("Hi"))]).unwrap();

    store.set_offline(true);
    let err = adapter
        .save("card", "props", &[("title", Value::from("Bye"))])
        .unwrap_err();
    assert!(err.to_string().contains("store is offline"));
    assert!(adapter.load("card", "props").is_err());

    store.set_offline(false);
    assert_eq!(
        adapter.load("card", "props").unwrap(),
        vec![("title".to_string(), Value::from("Hi"))]
    );
}
