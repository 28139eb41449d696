//! Trellis JS
//!
//! A synthetic "JS host value" runtime. Application code written against
//! [`Value`] reads and mutates a server-side [`trellis_dom::Document`] the
//! same way it would a browser DOM.
//!
//! # Example
//! ```rust,ignore
//! use trellis_js::{Environment, Value};
//!
//! let env = Environment::new();
//! let document = env.document();
//! let div = document.call("createElement", &[Value::from("div")]);
//! div.set("textContent", Value::from("hello"));
//! document.get("body").call("appendChild", &[div]);
//! ```

mod environment;
mod error;
mod func;
mod handle;
mod host;
pub mod promise;
pub mod storage;
mod value;

pub use environment::{Environment, Interface};
pub use error::HostError;
pub use func::Func;
pub use handle::{NodeHandle, SharedDocument};
pub use promise::{PendingPromise, Promise, PromiseError, PromiseState, Resolver, Thenable, await_promise};
pub use value::{StringMap, Type, Value};
