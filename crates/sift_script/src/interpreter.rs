//! Interpreter instances and their per-scope cache
//!
//! An [`Interpreter`] is one engine's live state plus the machinery that lets
//! its execution context abort it. Instances are cached in the scope under a
//! logical key and created at most once per key. The watcher is bound to the
//! context that created the instance; later calls with other contexts reuse
//! the instance without rebinding it.

use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use sift_core::{ExecutionContext, Scope, Value};

use crate::engine::{InterruptChannel, ScriptEngine};
use crate::watcher::Watcher;
use crate::ScriptError;

/// Prefix that keeps interpreter entries apart from other users of the
/// scope's cache.
const STORE_PREFIX: &str = "js:";

/// Cache entry for one key. The slot is inserted under the cache's lock;
/// the interpreter is built outside it, at most once.
type Slot = OnceCell<Arc<Interpreter>>;

pub struct Interpreter {
    key: String,
    engine: Mutex<Box<dyn ScriptEngine>>,
    interrupt: Arc<InterruptChannel>,
    watcher: Watcher,
}

impl Interpreter {
    /// Wrap `engine`, wire its interrupt channel, start a watcher bound to
    /// `ctx` and run the engine's one-time setup.
    pub fn new(
        ctx: &ExecutionContext,
        key: impl Into<String>,
        mut engine: Box<dyn ScriptEngine>,
    ) -> Result<Self, ScriptError> {
        let interrupt = Arc::new(InterruptChannel::new());
        engine.install_interrupt(Arc::clone(&interrupt));
        let watcher = Watcher::spawn(ctx.signal(), Arc::clone(&interrupt))?;

        let vm = Self {
            key: key.into(),
            engine: Mutex::new(engine),
            interrupt,
            watcher,
        };
        vm.execute(|engine| engine.prepare())?;
        Ok(vm)
    }

    /// Get or create the instance cached in `scope` under `key`.
    ///
    /// `create` runs only when no instance exists yet, at most once per key
    /// even when several calls race on a fresh key. A failed creation leaves
    /// nothing behind and the next call tries again.
    pub fn resolve<F>(
        ctx: &ExecutionContext,
        scope: &Scope,
        key: &str,
        create: F,
    ) -> Result<Arc<Self>, ScriptError>
    where
        F: FnOnce() -> Result<Box<dyn ScriptEngine>, ScriptError>,
    {
        let slot = scope.cache_get_or_try_insert::<Slot, ScriptError, _>(&store_key(key), || {
            Ok(Slot::new())
        })?;

        slot.get_or_try_init(|| {
            tracing::debug!(key, "creating interpreter instance");
            Interpreter::new(ctx, key, create()?).map(Arc::new)
        })
        .cloned()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this instance can still be aborted by its bound context.
    pub fn is_cancellable(&self) -> bool {
        !self.watcher.is_finished()
    }

    /// Compile and run `source`, discarding the result.
    pub fn run(&self, source: &str) -> Result<(), ScriptError> {
        self.execute(|engine| engine.run(source))
    }

    /// Call the global function `name` with positional `args`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        self.execute(|engine| engine.call(name, args))
    }

    fn execute<T>(
        &self,
        op: impl FnOnce(&mut dyn ScriptEngine) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);

        self.interrupt.begin();
        if self.interrupt.poll() {
            return Err(ScriptError::Cancelled);
        }
        if !self.is_cancellable() {
            tracing::debug!(key = %self.key, "running on an instance whose context has ended");
        }

        match op(engine.as_mut()) {
            Err(_) if self.interrupt.was_interrupted() => Err(ScriptError::Cancelled),
            result => result,
        }
    }
}

/// Key under which the instance for `key` is stored in the scope's cache.
pub fn store_key(key: &str) -> String {
    format!("{STORE_PREFIX}{key}")
}
