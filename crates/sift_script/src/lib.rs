//! Sift Scripting
//!
//! JavaScript query functions backed by QuickJS.
//!
//! ## Architecture
//!
//! - **Interpreter cache:** one engine instance per (scope, key), created on
//!   first use and reused by every later call with the same key
//! - **Cancellation:** each instance owns a watcher that aborts the running
//!   script when the creating execution context ends
//! - **Guard:** `js` and `js_call` never fail towards the host; errors are
//!   logged through the scope and null is returned
//!
//! The engine sits behind [`ScriptEngine`], so QuickJS can be replaced without
//! touching the cache, watcher or guard.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod functions;
pub mod guard;
pub mod host;
pub mod interpreter;
pub mod quickjs;
pub mod watcher;

pub use config::{ScriptConfig, DEFAULT_KEY};
pub use engine::{InterruptChannel, ScriptEngine};
pub use error::ScriptError;
pub use functions::{register, Js, JsCall};
pub use host::{EngineFactory, ScriptHost};
pub use interpreter::Interpreter;
pub use quickjs::QuickJsEngine;

pub use rquickjs;
