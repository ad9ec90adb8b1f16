//! Script runner and function invoker
//!
//! [`ScriptHost`] resolves the interpreter for a call and performs the work.
//! It returns errors; turning them into log lines and null results is the
//! guard's job.

use std::fmt;
use std::sync::Arc;

use sift_core::{ExecutionContext, LogSink, Scope, Value};

use crate::engine::ScriptEngine;
use crate::interpreter::Interpreter;
use crate::quickjs::QuickJsEngine;
use crate::{ScriptConfig, ScriptError};

/// Builds a fresh engine for a new interpreter instance.
pub type EngineFactory =
    Arc<dyn Fn(&ScriptConfig, Arc<dyn LogSink>) -> Result<Box<dyn ScriptEngine>, ScriptError> + Send + Sync>;

#[derive(Clone)]
pub struct ScriptHost {
    config: Arc<ScriptConfig>,
    factory: EngineFactory,
}

impl ScriptHost {
    /// Host backed by QuickJS.
    pub fn new(config: ScriptConfig) -> Self {
        Self::with_engine(config, Arc::new(quickjs))
    }

    /// Host backed by engines from `factory`.
    pub fn with_engine(config: ScriptConfig, factory: EngineFactory) -> Self {
        Self {
            config: Arc::new(config),
            factory,
        }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// The cache key a call uses; absent or empty keys map to the default.
    pub fn cache_key<'a>(&'a self, key: Option<&'a str>) -> &'a str {
        match key {
            Some(key) if !key.is_empty() => key,
            _ => &self.config.default_key,
        }
    }

    /// Get or create the interpreter for `key` in `scope`.
    pub fn interpreter(
        &self,
        ctx: &ExecutionContext,
        scope: &Scope,
        key: Option<&str>,
    ) -> Result<Arc<Interpreter>, ScriptError> {
        let key = self.cache_key(key);
        Interpreter::resolve(ctx, scope, key, || (self.factory)(self.config(), scope.sink()))
    }

    /// Compile and run `source` on the interpreter for `key`.
    pub fn run(
        &self,
        ctx: &ExecutionContext,
        scope: &Scope,
        key: Option<&str>,
        source: &str,
    ) -> Result<(), ScriptError> {
        self.interpreter(ctx, scope, key)?.run(source)
    }

    /// Call `name` on the interpreter for `key`.
    ///
    /// A sequence `args` is spread into positional arguments; any other value
    /// is passed as the single argument.
    pub fn call(
        &self,
        ctx: &ExecutionContext,
        scope: &Scope,
        key: Option<&str>,
        name: &str,
        args: Value,
    ) -> Result<Value, ScriptError> {
        let call_args = positional(args);
        let vm = self.interpreter(ctx, scope, key)?;
        vm.call(name, &call_args)
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptHost")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn quickjs(
    config: &ScriptConfig,
    sink: Arc<dyn LogSink>,
) -> Result<Box<dyn ScriptEngine>, ScriptError> {
    Ok(Box::new(QuickJsEngine::new(config, sink)?))
}

fn positional(args: Value) -> Vec<Value> {
    match args {
        Value::Array(items) => items,
        other => vec![other],
    }
}
