//! Script engine capability interface
//!
//! The interpreter cache, watcher and guard only talk to engines through
//! [`ScriptEngine`], so the embedded engine can be swapped without touching
//! them. Cancellation reaches an engine through an [`InterruptChannel`] that
//! the engine polls at its own safe points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sift_core::Value;

use crate::ScriptError;

/// An embedded script engine holding persistent global state.
pub trait ScriptEngine: Send {
    /// One-time setup such as library and prelude sources. Runs once per
    /// instance, after [`ScriptEngine::install_interrupt`], so a slow setup
    /// can still be cancelled.
    fn prepare(&mut self) -> Result<(), ScriptError> {
        Ok(())
    }

    /// Compile and execute `source`, discarding any produced value.
    fn run(&mut self, source: &str) -> Result<(), ScriptError>;

    /// Call the function at `name` (a global, or a dotted member path such
    /// as `Math.max`) with positional `args` and export the result.
    /// Engine null/undefined exports as [`Value::Null`].
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ScriptError>;

    /// Make the engine poll `channel` while it executes.
    fn install_interrupt(&mut self, channel: Arc<InterruptChannel>);
}

/// Capacity-one slot carrying the abort directive into a running engine.
#[derive(Debug, Default)]
pub struct InterruptChannel {
    pending: AtomicBool,
    tripped: AtomicBool,
}

impl InterruptChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post the abort directive. A second delivery while one is pending is
    /// absorbed.
    pub fn deliver(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Mark the start of an execution.
    pub fn begin(&self) {
        self.tripped.store(false, Ordering::Release);
    }

    /// Consume a pending directive. Returns `true` if the current execution
    /// must abort.
    pub fn poll(&self) -> bool {
        if self.pending.swap(false, Ordering::AcqRel) {
            self.tripped.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Whether the current execution consumed a directive.
    pub fn was_interrupted(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_is_consumed_once() {
        let channel = InterruptChannel::new();
        channel.begin();
        assert!(!channel.poll());

        channel.deliver();
        channel.deliver();
        assert!(channel.is_pending());
        assert!(channel.poll());
        assert!(channel.was_interrupted());
        assert!(!channel.poll());

        channel.begin();
        assert!(!channel.was_interrupted());
    }
}
