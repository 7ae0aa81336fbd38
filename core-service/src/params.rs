//! Tool argument parsing.
//!
//! Arguments are validated before any work is queued for the main thread,
//! so a malformed request never costs a host-thread time slot. Every failure
//! is `invalid_params` and names the offending field.

use core_runtime::error::{ToolError, ToolResult};
use serde_json::{Map, Value};

/// Normalized tool arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Accept an object, treating `null` and `[]` as no arguments.
    pub fn from_value(value: Value) -> ToolResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            Value::Array(items) if items.is_empty() => Ok(Self::default()),
            _ => Err(ToolError::invalid_params(
                "Tool arguments must be a JSON object.",
            )),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn require_string(&self, key: &str) -> ToolResult<String> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing("string", key))
    }

    pub fn require_number(&self, key: &str) -> ToolResult<f64> {
        self.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing("numeric", key))
    }

    /// Integers only: `1.0` is rejected.
    pub fn require_int(&self, key: &str) -> ToolResult<i64> {
        self.get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing("integer", key))
    }

    pub fn require_bool(&self, key: &str) -> ToolResult<bool> {
        self.get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing("boolean", key))
    }

    /// `default` when absent; a present value must be numeric.
    pub fn number_or(&self, key: &str, default: f64) -> ToolResult<f64> {
        if self.contains(key) {
            self.require_number(key)
        } else {
            Ok(default)
        }
    }

    /// `default` when absent; a present value must be boolean.
    pub fn bool_or(&self, key: &str, default: bool) -> ToolResult<bool> {
        if self.contains(key) {
            self.require_bool(key)
        } else {
            Ok(default)
        }
    }

    /// Optional array of strings; empty when absent.
    pub fn string_list(&self, key: &str) -> ToolResult<Vec<String>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an array.", key)))?;

        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ToolError::invalid_params(format!("{} must contain strings.", key))
                })
            })
            .collect()
    }

    /// Optional array of numbers, narrowed to `f32`; empty when absent.
    pub fn number_list(&self, key: &str) -> ToolResult<Vec<f32>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an array.", key)))?;

        items
            .iter()
            .map(|item| {
                item.as_f64().map(|n| n as f32).ok_or_else(|| {
                    ToolError::invalid_params(format!(
                        "{} must contain only numeric values.",
                        key
                    ))
                })
            })
            .collect()
    }
}

fn missing(kind: &str, key: &str) -> ToolError {
    ToolError::invalid_params(format!("Missing {} argument: {}", kind, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        Params::from_value(value).unwrap()
    }

    #[test]
    fn test_normalization() {
        assert_eq!(Params::from_value(Value::Null).unwrap(), Params::default());
        assert_eq!(Params::from_value(json!([])).unwrap(), Params::default());
        assert!(params(json!({"a": 1})).contains("a"));

        for bad in [json!([1]), json!("x"), json!(3), json!(true)] {
            let err = Params::from_value(bad).unwrap_err();
            assert!(err.is_invalid_params());
            assert_eq!(err.message, "Tool arguments must be a JSON object.");
        }
    }

    #[test]
    fn test_required_arguments_name_the_field() {
        let p = params(json!({"path": 5, "object_id": 1.5, "x": "1", "flag": 1}));

        assert_eq!(
            p.require_string("path").unwrap_err().message,
            "Missing string argument: path"
        );
        assert_eq!(
            p.require_int("object_id").unwrap_err().message,
            "Missing integer argument: object_id"
        );
        assert_eq!(
            p.require_number("x").unwrap_err().message,
            "Missing numeric argument: x"
        );
        assert_eq!(
            p.require_bool("flag").unwrap_err().message,
            "Missing boolean argument: flag"
        );
        assert_eq!(
            p.require_string("absent").unwrap_err().message,
            "Missing string argument: absent"
        );
    }

    #[test]
    fn test_numbers_accept_integers() {
        let p = params(json!({"x": 3, "y": -2.5, "id": 7}));
        assert_eq!(p.require_number("x").unwrap(), 3.0);
        assert_eq!(p.require_number("y").unwrap(), -2.5);
        assert_eq!(p.require_int("id").unwrap(), 7);
    }

    #[test]
    fn test_optional_values() {
        let p = params(json!({"pitch": 4.0, "double_precision": true, "roll": "x"}));
        assert_eq!(p.number_or("pitch", 0.0).unwrap(), 4.0);
        assert_eq!(p.number_or("heading", 0.0).unwrap(), 0.0);
        assert!(p.bool_or("double_precision", false).unwrap());
        assert!(!p.bool_or("other", false).unwrap());
        assert_eq!(
            p.number_or("roll", 0.0).unwrap_err().message,
            "Missing numeric argument: roll"
        );
    }

    #[test]
    fn test_string_list() {
        let p = params(json!({"datarefs": ["a", "b"], "bad": "a", "mixed": ["a", 1]}));
        assert_eq!(p.string_list("datarefs").unwrap(), vec!["a", "b"]);
        assert!(p.string_list("absent").unwrap().is_empty());
        assert_eq!(
            p.string_list("bad").unwrap_err().message,
            "bad must be an array."
        );
        assert_eq!(
            p.string_list("mixed").unwrap_err().message,
            "mixed must contain strings."
        );
    }

    #[test]
    fn test_number_list() {
        let p = params(json!({"data": [1, 2.5], "bad": {}, "mixed": [1, "2"]}));
        assert_eq!(p.number_list("data").unwrap(), vec![1.0, 2.5]);
        assert!(p.number_list("absent").unwrap().is_empty());
        assert_eq!(
            p.number_list("bad").unwrap_err().message,
            "bad must be an array."
        );
        assert_eq!(
            p.number_list("mixed").unwrap_err().message,
            "mixed must contain only numeric values."
        );
    }
}
