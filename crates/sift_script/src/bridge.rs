//! Value bridge between the host and QuickJS
//!
//! Values cross as JSON text. Anything without a JSON form (functions,
//! `undefined`) comes back as null.

use rquickjs::{CatchResultExt, Ctx};
use sift_core::Value;

use crate::ScriptError;

/// Convert a host value into a script value.
pub fn to_js<'js>(ctx: &Ctx<'js>, value: &Value) -> Result<rquickjs::Value<'js>, ScriptError> {
    if value.is_null() {
        return Ok(rquickjs::Value::new_null(ctx.clone()));
    }

    let text = serde_json::to_string(value)?;
    Ok(ctx.json_parse(text)?)
}

/// Export a script value into the host model.
pub fn from_js<'js>(ctx: &Ctx<'js>, value: rquickjs::Value<'js>) -> Result<Value, ScriptError> {
    if value.is_null() || value.is_undefined() {
        return Ok(Value::Null);
    }

    let text = ctx
        .json_stringify(value)
        .catch(ctx)
        .map_err(|err| ScriptError::Conversion(err.to_string()))?;

    match text {
        Some(text) => Ok(serde_json::from_str(&text.to_string()?)?),
        None => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};
    use serde_json::json;

    fn with_ctx<R>(f: impl FnOnce(Ctx<'_>) -> R) -> R {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(f)
    }

    #[test]
    fn test_structured_values_cross_both_ways() {
        with_ctx(|ctx| {
            let original = json!({ "a": [1, 2.5, "x"], "b": { "c": true }, "d": null });
            let js = to_js(&ctx, &original).unwrap();
            assert_eq!(from_js(&ctx, js).unwrap(), original);
        });
    }

    #[test]
    fn test_null_and_undefined_export_as_null() {
        with_ctx(|ctx| {
            let undefined: rquickjs::Value = ctx.eval("undefined").unwrap();
            let null: rquickjs::Value = ctx.eval("null").unwrap();
            let func: rquickjs::Value = ctx.eval("(function () {})").unwrap();

            assert_eq!(from_js(&ctx, undefined).unwrap(), Value::Null);
            assert_eq!(from_js(&ctx, null).unwrap(), Value::Null);
            assert_eq!(from_js(&ctx, func).unwrap(), Value::Null);
        });
    }

    #[test]
    fn test_null_export_is_idempotent() {
        with_ctx(|ctx| {
            let once = from_js(&ctx, rquickjs::Value::new_undefined(ctx.clone())).unwrap();
            let back = to_js(&ctx, &once).unwrap();
            assert_eq!(from_js(&ctx, back).unwrap(), Value::Null);
        });
    }

    #[test]
    fn test_bigint_fails_conversion() {
        with_ctx(|ctx| {
            let big: rquickjs::Value = ctx.eval("10n").unwrap();
            assert!(matches!(from_js(&ctx, big), Err(ScriptError::Conversion(_))));
        });
    }
}
