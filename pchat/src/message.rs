//! Conversation message records.
//!
//! ```rust
//! use pbackend::Role;
//! use pchat::Message;
//!
//! let message = Message::tool("8", "call_1", "add");
//! assert_eq!(message.role, Role::Tool);
//! assert_eq!(message.function_name(), Some("add"));
//!
//! let wire = message.to_backend();
//! assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
//! assert_eq!(wire.tool_name.as_deref(), Some("add"));
//! ```

use chrono::{DateTime, Utc};
use pbackend::{BackendMessage, Role, ToolCall};
use pcommon::{MessageId, MetadataMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FUNCTION_NAME_KEY: &str = "function_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MetadataMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            metadata: MetadataMap::new(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant turn that requested tool calls. An empty list is stored as
    /// no tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::assistant(content);
        if !tool_calls.is_empty() {
            message.tool_calls = Some(tool_calls);
        }
        message
    }

    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        let mut message = Self::new(Role::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
            .metadata
            .insert(FUNCTION_NAME_KEY.to_string(), Value::String(function_name.into()));
        message
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn function_name(&self) -> Option<&str> {
        self.metadata.get(FUNCTION_NAME_KEY).and_then(Value::as_str)
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    pub fn to_backend(&self) -> BackendMessage {
        let mut message = BackendMessage::new(self.role, self.content.clone());
        if let Some(tool_calls) = &self.tool_calls {
            message = message.with_tool_calls(tool_calls.clone());
        }
        if let Some(tool_call_id) = &self.tool_call_id {
            message = message.with_tool_call_id(tool_call_id.clone());
        }
        if let Some(function_name) = self.function_name() {
            message = message.with_tool_name(function_name);
        }
        message
    }
}
