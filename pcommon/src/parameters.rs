//! Generation parameters forwarded to the inference backend.
//!
//! Only keys that were explicitly set are serialized, so the backend's own
//! defaults apply to everything else.
//!
//! ```rust
//! use pcommon::ModelParameters;
//!
//! let parameters = ModelParameters::new()
//!     .with_temperature(0.2)
//!     .with_max_tokens(128)
//!     .with("mirostat", 2);
//!
//! let options = parameters.to_dict();
//! assert_eq!(options["temperature"], 0.2);
//! assert_eq!(options["num_predict"], 128);
//! assert_eq!(options["mirostat"], 2);
//! assert!(!options.contains_key("max_tokens"));
//! assert_eq!(parameters.top_p(), None);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_TOKENS_KEY: &str = "max_tokens";
pub const NUM_PREDICT_KEY: &str = "num_predict";
pub const THINK_KEY: &str = "think";

const TEMPERATURE_KEY: &str = "temperature";
const TOP_P_KEY: &str = "top_p";
const TOP_K_KEY: &str = "top_k";
const STOP_KEY: &str = "stop";
const PRESENCE_PENALTY_KEY: &str = "presence_penalty";
const FREQUENCY_PENALTY_KEY: &str = "frequency_penalty";
const REPEAT_PENALTY_KEY: &str = "repeat_penalty";
const NUM_CTX_KEY: &str = "num_ctx";
const SEED_KEY: &str = "seed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    Unset { key: String },
    Malformed { entry: String },
}

impl Display for ParameterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset { key } => write!(f, "model parameter '{key}' is not set"),
            Self::Malformed { entry } => {
                write!(f, "model parameter entry '{entry}' is not of the form key=value")
            }
        }
    }
}

impl Error for ParameterError {}

/// Insertion-ordered bag of backend generation options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelParameters {
    values: Map<String, Value>,
}

impl ModelParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Reads a key that the caller expects to be present.
    pub fn require(&self, key: &str) -> Result<&Value, ParameterError> {
        self.values.get(key).ok_or_else(|| ParameterError::Unset {
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn merge(&mut self, other: &ModelParameters) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn with_temperature(self, temperature: f64) -> Self {
        self.with(TEMPERATURE_KEY, temperature)
    }

    pub fn with_top_p(self, top_p: f64) -> Self {
        self.with(TOP_P_KEY, top_p)
    }

    pub fn with_top_k(self, top_k: u32) -> Self {
        self.with(TOP_K_KEY, top_k)
    }

    pub fn with_max_tokens(self, max_tokens: u32) -> Self {
        self.with(MAX_TOKENS_KEY, max_tokens)
    }

    pub fn with_stop<I, S>(self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop = stop
            .into_iter()
            .map(|sequence| Value::String(sequence.into()))
            .collect::<Vec<_>>();
        self.with(STOP_KEY, stop)
    }

    pub fn with_presence_penalty(self, penalty: f64) -> Self {
        self.with(PRESENCE_PENALTY_KEY, penalty)
    }

    pub fn with_frequency_penalty(self, penalty: f64) -> Self {
        self.with(FREQUENCY_PENALTY_KEY, penalty)
    }

    pub fn with_repeat_penalty(self, penalty: f64) -> Self {
        self.with(REPEAT_PENALTY_KEY, penalty)
    }

    pub fn with_num_ctx(self, num_ctx: u32) -> Self {
        self.with(NUM_CTX_KEY, num_ctx)
    }

    pub fn with_seed(self, seed: i64) -> Self {
        self.with(SEED_KEY, seed)
    }

    pub fn with_think(self, think: bool) -> Self {
        self.with(THINK_KEY, think)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.get(TEMPERATURE_KEY).and_then(Value::as_f64)
    }

    pub fn top_p(&self) -> Option<f64> {
        self.get(TOP_P_KEY).and_then(Value::as_f64)
    }

    pub fn top_k(&self) -> Option<u64> {
        self.get(TOP_K_KEY).and_then(Value::as_u64)
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.get(MAX_TOKENS_KEY).and_then(Value::as_u64)
    }

    pub fn stop(&self) -> Option<Vec<String>> {
        let values = self.get(STOP_KEY)?.as_array()?;
        Some(
            values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
        )
    }

    pub fn presence_penalty(&self) -> Option<f64> {
        self.get(PRESENCE_PENALTY_KEY).and_then(Value::as_f64)
    }

    pub fn frequency_penalty(&self) -> Option<f64> {
        self.get(FREQUENCY_PENALTY_KEY).and_then(Value::as_f64)
    }

    pub fn repeat_penalty(&self) -> Option<f64> {
        self.get(REPEAT_PENALTY_KEY).and_then(Value::as_f64)
    }

    pub fn num_ctx(&self) -> Option<u64> {
        self.get(NUM_CTX_KEY).and_then(Value::as_u64)
    }

    pub fn seed(&self) -> Option<i64> {
        self.get(SEED_KEY).and_then(Value::as_i64)
    }

    pub fn think(&self) -> Option<bool> {
        self.get(THINK_KEY).and_then(Value::as_bool)
    }

    /// Serializes every explicitly set key, renaming `max_tokens` to the
    /// backend's `num_predict`.
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut output = Map::with_capacity(self.values.len());
        for (key, value) in &self.values {
            if key == MAX_TOKENS_KEY {
                output.insert(NUM_PREDICT_KEY.to_string(), value.clone());
            } else {
                output.insert(key.clone(), value.clone());
            }
        }

        output
    }

    /// Same as [`to_dict`](Self::to_dict) without `think`, which travels as a
    /// top-level request flag instead of a sampling option.
    pub fn backend_options(&self) -> Map<String, Value> {
        let mut options = self.to_dict();
        options.shift_remove(THINK_KEY);
        options
    }
}

impl From<Map<String, Value>> for ModelParameters {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn to_dict_passes_arbitrary_keys_through_in_order() {
        let parameters = ModelParameters::new()
            .with("mirostat", 2)
            .with_temperature(0.7)
            .with("tfs_z", 1.5);

        let options = parameters.to_dict();
        let keys = options.keys().cloned().collect::<Vec<_>>();

        assert_eq!(keys, vec!["mirostat", "temperature", "tfs_z"]);
        assert_eq!(Value::Object(options), json!({"mirostat": 2, "temperature": 0.7, "tfs_z": 1.5}));
    }

    #[test]
    fn max_tokens_is_renamed_to_num_predict() {
        let parameters = ModelParameters::new().with_max_tokens(500);
        let options = parameters.to_dict();

        assert_eq!(options.get(NUM_PREDICT_KEY), Some(&json!(500)));
        assert!(!options.contains_key(MAX_TOKENS_KEY));
        assert_eq!(parameters.max_tokens(), Some(500));
    }

    #[test]
    fn empty_parameters_serialize_to_empty_map() {
        assert!(ModelParameters::new().to_dict().is_empty());
    }

    #[test]
    fn unset_keys_read_as_none_and_require_fails() {
        let parameters = ModelParameters::new().with_top_k(40);

        assert_eq!(parameters.temperature(), None);
        assert_eq!(parameters.top_k(), Some(40));

        let error = parameters
            .require("temperature")
            .expect_err("temperature is unset");
        assert_eq!(
            error,
            ParameterError::Unset {
                key: "temperature".to_string()
            }
        );
        assert!(error.to_string().contains("temperature"));
    }

    #[test]
    fn think_is_kept_in_dict_but_not_in_backend_options() {
        let parameters = ModelParameters::new().with_think(true).with_num_ctx(4096);

        assert_eq!(parameters.think(), Some(true));
        assert_eq!(parameters.to_dict().get(THINK_KEY), Some(&json!(true)));

        let options = parameters.backend_options();
        assert!(!options.contains_key(THINK_KEY));
        assert_eq!(options.get("num_ctx"), Some(&json!(4096)));
    }

    #[test]
    fn overwriting_a_key_keeps_its_position_and_unset_removes_it() {
        let mut parameters = ModelParameters::new()
            .with_temperature(0.1)
            .with_stop(["</s>"]);
        parameters.set("temperature", 0.9);

        assert_eq!(parameters.keys().collect::<Vec<_>>(), vec!["temperature", "stop"]);
        assert_eq!(parameters.temperature(), Some(0.9));
        assert_eq!(parameters.stop(), Some(vec!["</s>".to_string()]));

        assert_eq!(parameters.unset("stop"), Some(json!(["</s>"])));
        assert!(!parameters.contains("stop"));
        assert_eq!(parameters.len(), 1);
    }

    #[test]
    fn merge_overrides_existing_values() {
        let mut base = ModelParameters::new().with_temperature(0.2).with_seed(7);
        base.merge(&ModelParameters::new().with_temperature(0.8));

        assert_eq!(base.temperature(), Some(0.8));
        assert_eq!(base.seed(), Some(7));
    }
}
