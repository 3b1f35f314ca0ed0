//! Outcome of executing one tool call.

use std::time::Duration;

use pbackend::{BackendMessage, Role, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub function_name: String,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub execution_time: Option<Duration>,
}

impl ToolResult {
    pub fn success(call: &ToolCall, result: Value) -> Self {
        Self {
            tool_call_id: call_id(call),
            function_name: call.function.name.clone(),
            result: Some(result),
            error: None,
            execution_time: None,
        }
    }

    pub fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: call_id(call),
            function_name: call.function.name.clone(),
            result: None,
            error: Some(error.into()),
            execution_time: None,
        }
    }

    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.execution_time = Some(elapsed);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Text fed back to the model as the tool message body.
    pub fn to_message_content(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Error executing {}: {error}", self.function_name);
        }

        match &self.result {
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        }
    }

    pub fn to_backend_message(&self) -> BackendMessage {
        BackendMessage::new(Role::Tool, self.to_message_content())
            .with_tool_call_id(self.tool_call_id.clone())
            .with_tool_name(self.function_name.clone())
    }
}

/// Backends that omit call ids get the function name instead.
fn call_id(call: &ToolCall) -> String {
    call.id
        .clone()
        .unwrap_or_else(|| call.function.name.clone())
}
