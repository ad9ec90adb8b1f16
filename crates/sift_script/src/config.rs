//! Script settings

use serde::{Deserialize, Serialize};

/// Cache key used when a call does not name one.
pub const DEFAULT_KEY: &str = "__jscontext";

/// Settings shared by every interpreter instance a host creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Cache key for calls without a `key` argument.
    pub default_key: String,
    /// Heap limit per instance, in bytes.
    pub memory_limit: Option<usize>,
    /// Native stack limit per instance, in bytes.
    pub max_stack_size: Option<usize>,
    /// Install `console.log`, routed to the scope log.
    pub console: bool,
    /// Load the bundled Underscore.js as `_` before the prelude.
    pub underscore: bool,
    /// Sources run once on every new instance, in order.
    pub prelude: Vec<String>,
}

impl ScriptConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            default_key: DEFAULT_KEY.to_string(),
            memory_limit: None,
            max_stack_size: None,
            console: true,
            underscore: false,
            prelude: Vec::new(),
        }
    }
}
