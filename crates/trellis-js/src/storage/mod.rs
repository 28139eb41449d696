//! Persistence: key/value backends and the element storage adapter
//!
//! Two synchronous backends wrap a [`WebStorage`] (session-scoped in memory,
//! or app-scoped in a JSON file). The asynchronous [`AsyncStore`] is driven
//! through the promise bridge so that all three look the same to
//! [`StorageAdapter`].

mod adapter;
mod async_store;
mod backend;
pub mod json;
mod web_storage;

pub use adapter::{CONNECTED_KEY, StorageAdapter};
pub use async_store::AsyncStore;
pub use backend::{AsyncBackend, Backend, SyncBackend};
pub use web_storage::WebStorage;

use crate::PromiseError;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An asynchronous operation rejected or timed out
    #[error(transparent)]
    Promise(#[from] PromiseError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The value has no JSON form
    #[error("cannot store a value of type {0}")]
    Unserializable(&'static str),
}
