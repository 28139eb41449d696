//! Runtime Configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Runtime configuration options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    pub log_filter: String,

    /// File backing the app-scoped store. In memory when unset.
    pub local_storage_path: Option<PathBuf>,

    /// Delay before each async store operation settles
    pub async_store_latency_ms: u64,

    /// Bound on each async store wait. Unbounded when unset.
    pub promise_timeout_ms: Option<u64>,

    /// Write the storage sentinel on startup
    pub connect_storage: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            local_storage_path: None,
            async_store_latency_ms: 0,
            promise_timeout_ms: None,
            connect_storage: true,
        }
    }
}

impl Config {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid trellis configuration")
    }

    /// Read and parse a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn async_store_latency(&self) -> Duration {
        Duration::from_millis(self.async_store_latency_ms)
    }

    pub fn promise_timeout(&self) -> Option<Duration> {
        self.promise_timeout_ms.map(Duration::from_millis)
    }
}
