//! QuickJS engine
//!
//! One [`QuickJsEngine`] owns a QuickJS runtime and a full context. Globals
//! defined by one run stay visible to every later run and call. Scripts run as
//! sloppy-mode global code, so assigning an undeclared name creates a global.

use std::borrow::Cow;
use std::sync::Arc;

use rquickjs::context::EvalOptions;
use rquickjs::convert::Coerced;
use rquickjs::function::{Rest, This};
use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Object, Runtime};
use sift_core::{LogSink, Value};

use crate::bridge;
use crate::engine::{InterruptChannel, ScriptEngine};
use crate::{ScriptConfig, ScriptError};

/// Underscore.js, installed as `_` when enabled in the settings.
const UNDERSCORE: &str = include_str!("../js/underscore.js");

/// QuickJS-backed script engine
pub struct QuickJsEngine {
    runtime: Runtime,
    context: Context,
    prelude: Vec<Cow<'static, str>>,
}

impl QuickJsEngine {
    /// Create an engine with the limits and globals from `config`.
    /// `console.log` output goes to `sink`.
    ///
    /// Library and prelude sources are queued, not run; they run in
    /// [`ScriptEngine::prepare`].
    pub fn new(config: &ScriptConfig, sink: Arc<dyn LogSink>) -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = config.max_stack_size {
            runtime.set_max_stack_size(size);
        }

        let mut prelude = Vec::with_capacity(config.prelude.len() + 1);
        if config.underscore {
            prelude.push(Cow::Borrowed(UNDERSCORE));
        }
        prelude.extend(config.prelude.iter().cloned().map(Cow::Owned));

        let context = Context::full(&runtime)?;
        let engine = Self {
            runtime,
            context,
            prelude,
        };

        if config.console {
            engine.install_console(sink)?;
        }

        Ok(engine)
    }

    fn install_console(&self, sink: Arc<dyn LogSink>) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            let log = Function::new(ctx.clone(), move |parts: Rest<Coerced<String>>| {
                let line: Vec<String> = parts.0.into_iter().map(|part| part.0).collect();
                sink.log(&format!("console: {}", line.join(" ")));
            })?;

            let console = Object::new(ctx.clone())?;
            console.set("log", log)?;
            ctx.globals().set("console", console)?;
            Ok::<_, rquickjs::Error>(())
        })?;
        Ok(())
    }
}

impl ScriptEngine for QuickJsEngine {
    fn prepare(&mut self) -> Result<(), ScriptError> {
        for source in std::mem::take(&mut self.prelude) {
            self.run(&source)?;
        }
        Ok(())
    }

    fn run(&mut self, source: &str) -> Result<(), ScriptError> {
        let mut options = EvalOptions::default();
        options.strict = false;
        self.context.with(|ctx| {
            ctx.eval_with_options::<(), _>(source, options)
                .catch(&ctx)
                .map_err(script_error)
        })
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        self.context.with(|ctx| {
            let (owner, func) = callee(&ctx, name)?;

            let mut call_args = Vec::with_capacity(args.len());
            for arg in args {
                call_args.push(bridge::to_js(&ctx, arg)?);
            }

            let result: rquickjs::Value = func
                .call((This(owner), Rest(call_args)))
                .catch(&ctx)
                .map_err(script_error)?;

            bridge::from_js(&ctx, result)
        })
    }

    fn install_interrupt(&mut self, channel: Arc<InterruptChannel>) {
        self.runtime
            .set_interrupt_handler(Some(Box::new(move || channel.poll())));
    }
}

/// Resolve a dotted path such as `Math.max` or `obj.method` from the global
/// object. Returns the function and the object it was read from, which is
/// bound as `this` for the call.
fn callee<'js>(ctx: &Ctx<'js>, path: &str) -> Result<(Object<'js>, Function<'js>), ScriptError> {
    let not_a_function = || ScriptError::NotAFunction {
        name: path.to_string(),
    };

    let (parents, member) = match path.rsplit_once('.') {
        Some((parents, member)) => (Some(parents), member),
        None => (None, path),
    };

    let mut owner = ctx.globals();
    for segment in parents.into_iter().flat_map(|parents| parents.split('.')) {
        let next: rquickjs::Value = owner.get(segment).catch(ctx).map_err(script_error)?;
        owner = next.into_object().ok_or_else(not_a_function)?;
    }

    let target: rquickjs::Value = owner.get(member).catch(ctx).map_err(script_error)?;
    let func = target.into_function().ok_or_else(not_a_function)?;
    Ok((owner, func))
}

/// Render a caught exception as `Name: message`, followed by the script
/// stack when there is one.
fn script_error(err: CaughtError<'_>) -> ScriptError {
    let text = match err {
        CaughtError::Exception(exception) => {
            let message = exception.message().unwrap_or_default();
            let head = match exception.get::<_, Option<String>>("name") {
                Ok(Some(name)) => format!("{name}: {message}"),
                _ => message,
            };
            match exception.stack() {
                Some(stack) if !stack.trim().is_empty() => format!("{head}\n{}", stack.trim_end()),
                _ => head,
            }
        }
        CaughtError::Value(value) => match value.get::<Coerced<String>>() {
            Ok(text) => format!("uncaught {}", text.0),
            Err(_) => format!("uncaught {value:?}"),
        },
        CaughtError::Error(err) => err.to_string(),
    };
    ScriptError::Script(text)
}
