//! Logging setup

use tracing_subscriber::EnvFilter;

use crate::Config;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `config.log_filter`. Returns false if a global subscriber was already
/// set.
pub fn init_logging(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(%err, "logging already initialized");
            false
        }
    }
}
