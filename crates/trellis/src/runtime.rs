//! Runtime - Main entry point

use anyhow::Context;
use trellis_js::storage::{AsyncBackend, AsyncStore, StorageAdapter, SyncBackend};
use trellis_js::{Environment, Value};

use crate::Config;

/// One rendering environment with its three stores
#[derive(Debug)]
pub struct Runtime {
    config: Config,
    environment: Environment,
    session_storage: StorageAdapter<SyncBackend>,
    local_storage: StorageAdapter<SyncBackend>,
    async_storage: StorageAdapter<AsyncBackend>,
}

impl Runtime {
    /// Runtime over an empty `about:blank` document
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_environment(config, Environment::new())
    }

    /// Runtime over a parsed page
    pub fn from_html(config: Config, html: &str) -> anyhow::Result<Self> {
        Self::with_environment(config, Environment::from_html(html))
    }

    fn with_environment(config: Config, environment: Environment) -> anyhow::Result<Self> {
        let local_backend = match &config.local_storage_path {
            Some(path) => SyncBackend::local(path)
                .with_context(|| format!("failed to open local storage {}", path.display()))?,
            None => SyncBackend::session(),
        };

        let store = AsyncStore::with_latency(config.async_store_latency());
        let async_backend = match config.promise_timeout() {
            Some(timeout) => AsyncBackend::with_timeout(store, timeout),
            None => AsyncBackend::new(store),
        };

        let runtime = Self {
            session_storage: StorageAdapter::new(SyncBackend::session()),
            local_storage: StorageAdapter::new(local_backend),
            async_storage: StorageAdapter::new(async_backend),
            environment,
            config,
        };

        if runtime.config.connect_storage {
            runtime.session_storage.connect().context("failed to connect session storage")?;
            runtime.local_storage.connect().context("failed to connect local storage")?;
            runtime.async_storage.connect().context("failed to connect async storage")?;
        }

        tracing::info!("Trellis runtime {} initialized", crate::VERSION);
        Ok(runtime)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The `window` stub
    pub fn global(&self) -> Value {
        self.environment.global()
    }

    /// The `document` node
    pub fn document(&self) -> Value {
        self.environment.document()
    }

    pub fn session_storage(&self) -> &StorageAdapter<SyncBackend> {
        &self.session_storage
    }

    pub fn local_storage(&self) -> &StorageAdapter<SyncBackend> {
        &self.local_storage
    }

    pub fn async_storage(&self) -> &StorageAdapter<AsyncBackend> {
        &self.async_storage
    }

    /// Serialize the page, with a doctype
    pub fn render(&self) -> String {
        let html = self.environment.to_html();
        if html.starts_with("<!DOCTYPE") {
            html
        } else {
            format!("<!DOCTYPE html>{html}")
        }
    }
}
