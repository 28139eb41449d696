//! Trellis
//!
//! Server-side DOM runtime for reactive web apps: a synthetic document that
//! corrects its own content model, a JS-like host value API over it, and
//! element persistence across three storage backends.
//!
//! # Example
//! ```rust,ignore
//! use trellis::{Config, Runtime, Value};
//!
//! let runtime = Runtime::new(Config::default())?;
//! let table = runtime.document().call("createElement", &[Value::from("table")]);
//! runtime.document().get("body").call("appendChild", &[table]);
//! println!("{}", runtime.render());
//! ```

mod config;
mod logging;
mod runtime;

pub use config::Config;
pub use logging::init_logging;
pub use runtime::Runtime;

pub use trellis_dom as dom;
pub use trellis_html as html;
pub use trellis_js as js;
pub use trellis_js::{Environment, Value};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
