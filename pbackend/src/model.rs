//! Wire-level request, reply, and message types for the chat endpoint.
//!
//! ```rust
//! use pbackend::{BackendErrorKind, BackendMessage, ChatRequest, Role};
//!
//! let ok = ChatRequest::builder("llama3.2")
//!     .message(BackendMessage::new(Role::User, "Summarize this diff"))
//!     .build();
//! assert!(ok.is_ok());
//!
//! let err = ChatRequest::builder("  ")
//!     .message(BackendMessage::new(Role::User, "hi"))
//!     .build()
//!     .err()
//!     .expect("empty model should fail");
//! assert_eq!(err.kind, BackendErrorKind::InvalidRequest);
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BackendError, FeatureSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BackendError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(BackendError::decode(format!("unknown message role '{other}'"))),
        }
    }
}

/// Function half of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: Map<String, Value>,
}

/// Structured request, emitted by the model, to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: ToolCallFunction,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: None,
            function: ToolCallFunction {
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Decodes one wire entry, tolerating missing or malformed pieces.
    pub fn from_value(value: &Value) -> Option<Self> {
        let function = value.get("function")?;
        let name = function.get("name")?.as_str()?.to_string();
        let arguments = function
            .get("arguments")
            .map(arguments_from_value)
            .unwrap_or_default();
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        Some(Self {
            id,
            function: ToolCallFunction { name, arguments },
        })
    }
}

fn arguments_from_value(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

fn deserialize_arguments<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(arguments_from_value).unwrap_or_default())
}

/// Name, description, and JSON-schema parameters advertised for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema::function(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolDefinition,
}

impl ToolSchema {
    pub fn function(definition: ToolDefinition) -> Self {
        Self {
            kind: "function".to_string(),
            function: definition,
        }
    }
}

/// One entry of the message list sent with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl BackendMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<BackendMessage>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl ChatRequest {
    pub fn builder(model: impl Into<String>) -> ChatRequestBuilder {
        ChatRequestBuilder::new(model)
    }

    pub fn new(model: impl Into<String>, messages: Vec<BackendMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: Map::new(),
            tools: None,
            think: None,
            stream: false,
            keep_alive: None,
        }
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    pub fn with_think(mut self, think: Option<bool>) -> Self {
        self.think = think;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn enable_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Optional features this request asks the backend for.
    pub fn features(&self) -> FeatureSet {
        FeatureSet {
            tools: self.tools.as_ref().is_some_and(|tools| !tools.is_empty()),
            think: self.think,
        }
    }

    /// Copy of this request restricted to `features`.
    pub fn restricted_to(&self, features: FeatureSet) -> Self {
        let mut request = self.clone();
        if !features.tools {
            request.tools = None;
        }
        if features.think.is_none() {
            request.think = None;
        }
        request
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        if self.model.trim().is_empty() {
            return Err(BackendError::invalid_request("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(BackendError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(tools) = &self.tools
            && let Some(tool) = tools.iter().find(|tool| tool.function.name.trim().is_empty())
        {
            return Err(BackendError::invalid_request(format!(
                "tool schema with description '{}' has an empty name",
                tool.function.description
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequestBuilder {
    request: ChatRequest,
}

impl ChatRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            request: ChatRequest::new(model, Vec::new()),
        }
    }

    pub fn message(mut self, message: BackendMessage) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<BackendMessage>) -> Self {
        self.request.messages = messages;
        self
    }

    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.request.options = options;
        self
    }

    pub fn tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.request = self.request.with_tools(tools);
        self
    }

    pub fn think(mut self, think: Option<bool>) -> Self {
        self.request.think = think;
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.request.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.request.stream = stream;
        self
    }

    pub fn build(self) -> Result<ChatRequest, BackendError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

/// The `message` object of a backend reply. Every field is optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseMessage {
    pub role: Option<Role>,
    pub content: Option<String>,
    pub thinking: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ResponseMessage {
    fn from_value(value: &Value) -> Self {
        let role = value
            .get("role")
            .and_then(Value::as_str)
            .and_then(|role| role.parse().ok());
        let tool_calls = value.get("tool_calls").and_then(Value::as_array).map(|calls| {
            calls
                .iter()
                .filter_map(ToolCall::from_value)
                .collect::<Vec<_>>()
        });

        Self {
            role,
            content: string_field(value, "content"),
            thinking: string_field(value, "thinking"),
            tool_calls,
        }
    }
}

/// A complete reply or a single streamed chunk.
///
/// Built field-by-field from raw JSON: a field with an unexpected shape reads
/// as absent rather than failing the whole reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub message: Option<ResponseMessage>,
    pub done: Option<bool>,
    pub done_reason: Option<String>,
    pub prompt_eval_count: Option<u64>,
    pub eval_count: Option<u64>,
    pub raw: Value,
}

impl ChatResponse {
    pub fn from_value(raw: Value) -> Self {
        let message = raw
            .get("message")
            .filter(|message| message.is_object())
            .map(ResponseMessage::from_value);

        Self {
            model: string_field(&raw, "model"),
            message,
            done: raw.get("done").and_then(Value::as_bool),
            done_reason: string_field(&raw, "done_reason"),
            prompt_eval_count: raw.get("prompt_eval_count").and_then(Value::as_u64),
            eval_count: raw.get("eval_count").and_then(Value::as_u64),
            raw,
        }
    }

    pub fn from_json(payload: &str) -> Result<Self, BackendError> {
        let raw = serde_json::from_str::<Value>(payload)
            .map_err(|err| BackendError::decode(err.to_string()))?;
        Ok(Self::from_value(raw))
    }

    pub fn content(&self) -> Option<&str> {
        self.message.as_ref()?.content.as_deref()
    }

    pub fn thinking(&self) -> Option<&str> {
        self.message.as_ref()?.thinking.as_deref()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message
            .as_ref()
            .and_then(|message| message.tool_calls.as_deref())
            .unwrap_or_default()
    }

    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_serializes_only_present_optional_fields() {
        let mut options = Map::new();
        options.insert("num_predict".to_string(), json!(64));
        let request = ChatRequest::new(
            "llama3.2",
            vec![BackendMessage::new(Role::User, "hi")],
        )
        .with_options(options);

        let encoded = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(
            encoded,
            json!({
                "model": "llama3.2",
                "messages": [{"role": "user", "content": "hi"}],
                "options": {"num_predict": 64},
                "stream": false
            })
        );
    }

    #[test]
    fn request_with_tools_and_think_encodes_function_schemas() {
        let definition = ToolDefinition::new(
            "add",
            "Add two numbers",
            json!({"type": "object", "properties": {"a": {"type": "integer"}}}),
        );
        let request = ChatRequest::builder("qwen3")
            .message(BackendMessage::new(Role::User, "2+2?"))
            .tools(vec![definition.to_schema()])
            .think(Some(true))
            .streaming(true)
            .build()
            .expect("request should build");

        let encoded = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(encoded["tools"][0]["type"], "function");
        assert_eq!(encoded["tools"][0]["function"]["name"], "add");
        assert_eq!(encoded["think"], true);
        assert_eq!(encoded["stream"], true);
        assert!(encoded.get("options").is_none());
        assert!(request.features().tools);
    }

    #[test]
    fn restricted_request_drops_disabled_features() {
        let request = ChatRequest::new("m", vec![BackendMessage::new(Role::User, "x")])
            .with_tools(vec![ToolDefinition::new("t", "d", json!({})).to_schema()])
            .with_think(Some(true));

        let stripped = request.restricted_to(FeatureSet::none());
        assert!(stripped.tools.is_none());
        assert!(stripped.think.is_none());

        let tools_only = request.restricted_to(FeatureSet {
            tools: true,
            think: None,
        });
        assert!(tools_only.tools.is_some());
        assert!(tools_only.think.is_none());
    }

    #[test]
    fn validate_rejects_empty_messages_and_unnamed_tools() {
        let empty = ChatRequest::new("m", Vec::new());
        assert!(empty.validate().is_err());

        let unnamed = ChatRequest::new("m", vec![BackendMessage::new(Role::User, "x")])
            .with_tools(vec![ToolDefinition::new(" ", "d", json!({})).to_schema()]);
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn tool_message_carries_call_id_and_name() {
        let message = BackendMessage::new(Role::Tool, "8")
            .with_tool_call_id("call_1")
            .with_tool_name("add");

        let encoded = serde_json::to_value(&message).expect("message should encode");
        assert_eq!(
            encoded,
            json!({"role": "tool", "content": "8", "tool_call_id": "call_1", "tool_name": "add"})
        );
    }

    #[test]
    fn tool_call_arguments_accept_object_string_or_null() {
        let object: ToolCall = serde_json::from_value(json!({
            "function": {"name": "add", "arguments": {"a": 1}}
        }))
        .expect("object arguments");
        assert_eq!(object.function.arguments["a"], 1);

        let encoded: ToolCall = serde_json::from_value(json!({
            "id": "call_9",
            "function": {"name": "add", "arguments": "{\"a\": \"5\"}"}
        }))
        .expect("string arguments");
        assert_eq!(encoded.id.as_deref(), Some("call_9"));
        assert_eq!(encoded.function.arguments["a"], "5");

        let null: ToolCall = serde_json::from_value(json!({
            "function": {"name": "now", "arguments": null}
        }))
        .expect("null arguments");
        assert!(null.function.arguments.is_empty());
    }

    #[test]
    fn response_decodes_present_fields_and_keeps_raw() {
        let raw = json!({
            "model": "llama3.2",
            "message": {
                "role": "assistant",
                "content": "",
                "thinking": "hmm",
                "tool_calls": [
                    {"function": {"name": "add", "arguments": {"a": "5", "b": "3"}}},
                    {"function": {"arguments": {}}}
                ]
            },
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 12,
            "eval_count": 7
        });

        let response = ChatResponse::from_value(raw.clone());
        assert_eq!(response.model.as_deref(), Some("llama3.2"));
        assert_eq!(response.content(), Some(""));
        assert_eq!(response.thinking(), Some("hmm"));
        assert_eq!(response.tool_calls().len(), 1);
        assert_eq!(response.tool_calls()[0].name(), "add");
        assert!(response.is_done());
        assert_eq!(response.done_reason.as_deref(), Some("stop"));
        assert_eq!(response.prompt_eval_count, Some(12));
        assert_eq!(response.eval_count, Some(7));
        assert_eq!(response.raw, raw);
    }

    #[test]
    fn malformed_response_fields_read_as_absent() {
        let response = ChatResponse::from_value(json!({
            "message": "not-an-object",
            "done": "yes",
            "eval_count": -3
        }));

        assert!(response.message.is_none());
        assert_eq!(response.content(), None);
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.done, None);
        assert_eq!(response.eval_count, None);
        assert!(!response.is_done());

        assert!(ChatResponse::from_json("{not json").is_err());
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::System, Role::User, Role::Assistant, Role::Tool] {
            assert_eq!(role.to_string().parse::<Role>().expect("role"), role);
        }
        assert!("robot".parse::<Role>().is_err());
    }
}
