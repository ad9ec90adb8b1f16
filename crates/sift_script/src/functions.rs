//! The `js` and `js_call` query functions

use serde::Deserialize;
use sift_core::{
    extract_args, ArgKind, Args, ExecutionContext, Function, FunctionHandle, FunctionInfo,
    FunctionRegistry, RegistrationError, Scope, Value,
};

use crate::guard::guarded;
use crate::{ScriptConfig, ScriptHost};

const KEY_DOC: &str = "If set use this key to cache the JS VM.";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsArgs {
    js: String,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsCallArgs {
    func: String,
    args: Value,
    #[serde(default)]
    key: Option<String>,
}

/// `js(js, key)`: compile and run a snippet. Always returns null.
#[derive(Debug, Clone)]
pub struct Js {
    host: ScriptHost,
}

impl Js {
    pub fn new(host: ScriptHost) -> Self {
        Self { host }
    }
}

impl Function for Js {
    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("js")
            .doc("Compile and run javascript code.")
            .required("js", ArgKind::String, "The body of the javascript code.")
            .optional("key", ArgKind::String, KEY_DOC)
    }

    fn call(&self, ctx: &ExecutionContext, scope: &Scope, args: Args) -> Value {
        let arg: JsArgs = match extract_args(args) {
            Ok(arg) => arg,
            Err(err) => {
                scope.log(format!("js: {err}"));
                return Value::Null;
            }
        };

        guarded(scope, "js", || {
            self.host.run(ctx, scope, arg.key.as_deref(), &arg.js)?;
            Ok(Value::Null)
        })
    }
}

/// `js_call(func, args, key)`: call a function defined by earlier `js` runs.
#[derive(Debug, Clone)]
pub struct JsCall {
    host: ScriptHost,
}

impl JsCall {
    pub fn new(host: ScriptHost) -> Self {
        Self { host }
    }
}

impl Function for JsCall {
    fn info(&self) -> FunctionInfo {
        FunctionInfo::new("js_call")
            .doc("Call a javascript function defined by earlier js() calls.")
            .required("func", ArgKind::String, "JS function to call.")
            .required("args", ArgKind::Any, "Positional args for the function.")
            .optional("key", ArgKind::String, KEY_DOC)
    }

    fn call(&self, ctx: &ExecutionContext, scope: &Scope, args: Args) -> Value {
        let arg: JsCallArgs = match extract_args(args) {
            Ok(arg) => arg,
            Err(err) => {
                scope.log(format!("js_call: {err}"));
                return Value::Null;
            }
        };

        guarded(scope, "js_call", || {
            self.host
                .call(ctx, scope, arg.key.as_deref(), &arg.func, arg.args)
        })
    }
}

/// Register `js` and `js_call`, sharing one host built from `config`.
pub fn register(
    registry: &mut FunctionRegistry,
    config: ScriptConfig,
) -> Result<[FunctionHandle; 2], RegistrationError> {
    let host = ScriptHost::new(config);
    let js = registry.register(Js::new(host.clone()))?;
    let js_call = registry.register(JsCall::new(host))?;
    Ok([js, js_call])
}
