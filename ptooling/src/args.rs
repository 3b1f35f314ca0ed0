//! Tool argument access and string-to-number coercion.
//!
//! Models frequently send numbers as strings (`{"a": "5"}`). Under the default
//! [`CoercionPolicy::Numeric`] such values are converted before the tool runs.
//!
//! ```rust
//! use ptooling::{CoercionPolicy, ToolArguments};
//! use serde_json::json;
//!
//! let args = ToolArguments::from_value(json!({"a": "5", "b": "2.5", "name": "abc"}))
//!     .expect("object arguments")
//!     .coerced(CoercionPolicy::Numeric);
//!
//! assert_eq!(args.required_i64("a").expect("a"), 5);
//! assert_eq!(args.required_f64("b").expect("b"), 2.5);
//! assert_eq!(args.required_string("name").expect("name"), "abc");
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Digit-only strings become integers, other numeric strings become
    /// floats, everything else is left alone.
    #[default]
    Numeric,
    Disabled,
}

/// Applies [`CoercionPolicy::Numeric`] to a single value.
///
/// Only top-level strings are converted. A digit-only string becomes an
/// integer when it fits in `i64` or `u64`, otherwise it is tried as a float.
/// Any other string is parsed as a finite `f64` and kept verbatim on failure.
pub fn coerce_argument(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };

    if !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()) {
        if let Ok(integer) = text.parse::<i64>() {
            return Value::Number(integer.into());
        }
        if let Ok(integer) = text.parse::<u64>() {
            return Value::Number(integer.into());
        }
    }

    // `Number::from_f64` rejects NaN and infinities.
    match text.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => Value::Number(number),
        None => Value::String(text),
    }
}

pub fn coerce_arguments(arguments: Map<String, Value>, policy: CoercionPolicy) -> Map<String, Value> {
    match policy {
        CoercionPolicy::Disabled => arguments,
        CoercionPolicy::Numeric => arguments
            .into_iter()
            .map(|(key, value)| (key, coerce_argument(value)))
            .collect(),
    }
}

/// Named arguments handed to a tool invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            _ => Err(ToolError::invalid_arguments("expected JSON object arguments")),
        }
    }

    pub fn from_json(args_json: &str) -> Result<Self, ToolError> {
        Ok(Self::new(parse_json_object(args_json)?))
    }

    pub fn coerced(self, policy: CoercionPolicy) -> Self {
        Self {
            values: coerce_arguments(self.values, policy),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Deserializes every argument into a typed struct.
    pub fn parse<T>(&self) -> Result<T, ToolError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|err| ToolError::invalid_arguments(format!("invalid arguments: {err}")))
    }

    pub fn required_string(&self, key: &str) -> Result<String, ToolError> {
        self.optional_string(key).ok_or_else(|| missing(key, "string"))
    }

    pub fn required_i64(&self, key: &str) -> Result<i64, ToolError> {
        self.optional_i64(key).ok_or_else(|| missing(key, "integer"))
    }

    pub fn required_f64(&self, key: &str) -> Result<f64, ToolError> {
        self.optional_f64(key).ok_or_else(|| missing(key, "number"))
    }

    pub fn required_bool(&self, key: &str) -> Result<bool, ToolError> {
        self.optional_bool(key).ok_or_else(|| missing(key, "boolean"))
    }

    pub fn optional_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(ToString::to_string)
    }

    pub fn optional_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn optional_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn optional_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

fn missing(key: &str, expected: &str) -> ToolError {
    ToolError::invalid_arguments(format!("missing required {expected}: '{key}'"))
}

pub fn parse_json_value(args_json: &str) -> Result<Value, ToolError> {
    serde_json::from_str(args_json)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

pub fn parse_json_object(args_json: &str) -> Result<Map<String, Value>, ToolError> {
    match parse_json_value(args_json)? {
        Value::Object(values) => Ok(values),
        _ => Err(ToolError::invalid_arguments("expected JSON object arguments")),
    }
}
