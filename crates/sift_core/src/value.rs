//! Host value model
//!
//! Query functions exchange `serde_json::Value`. `Value::Null` is the null
//! sentinel returned whenever a function has no result or failed.

use serde::de::DeserializeOwned;

use crate::ArgError;

pub use serde_json::Value;

/// Named call arguments, in the order the caller supplied them.
pub type Args = serde_json::Map<String, Value>;

/// Extract a typed argument struct from named call arguments.
///
/// Required fields are the non-`Option` fields of `T`. Missing fields, wrong
/// types and (with `#[serde(deny_unknown_fields)]`) unexpected names are all
/// reported as [`ArgError`].
pub fn extract_args<T: DeserializeOwned>(args: Args) -> Result<T, ArgError> {
    Ok(serde_json::from_value(Value::Object(args))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        name: String,
        #[serde(default)]
        key: Option<String>,
    }

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_extract_required_and_optional() {
        let sample: Sample = extract_args(args(json!({ "name": "f" }))).unwrap();
        assert_eq!(sample.name, "f");
        assert!(sample.key.is_none());
    }

    #[test]
    fn test_extract_missing_field() {
        let err = extract_args::<Sample>(args(json!({ "key": "k" }))).unwrap_err();
        assert!(err.to_string().contains("missing field `name`"));
    }

    #[test]
    fn test_extract_wrong_type() {
        let err = extract_args::<Sample>(args(json!({ "name": 12 }))).unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn test_extract_unknown_field() {
        let err = extract_args::<Sample>(args(json!({ "name": "f", "extra": 1 }))).unwrap_err();
        assert!(err.to_string().contains("unknown field `extra`"));
    }
}
