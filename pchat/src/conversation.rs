//! Append-only conversation log.
//!
//! ```rust
//! use pbackend::Role;
//! use pchat::Conversation;
//!
//! let mut conversation = Conversation::new("llama3.2");
//! conversation.add_system_message("You are terse.");
//! conversation.add_user_message("Hi");
//! conversation.add_assistant_message("Hello.");
//!
//! let history = conversation.get_message_history();
//! assert_eq!(history.len(), 3);
//! assert_eq!(history[2].role, Role::Assistant);
//!
//! conversation.clear();
//! assert!(conversation.is_empty());
//! ```

use chrono::{DateTime, Utc};
use pbackend::{BackendMessage, ToolCall};
use pcommon::{ConversationId, MessageId, MetadataMap};
use ptooling::ToolResult;
use serde::{Deserialize, Serialize};

use crate::Message;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MetadataMap,
}

impl Conversation {
    pub fn new(model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            model: model.into(),
            title: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: MetadataMap::new(),
        }
    }

    /// Rebuilds a stored conversation without touching its timestamps.
    pub fn restore(
        id: ConversationId,
        model: impl Into<String>,
        messages: Vec<Message>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            model: model.into(),
            title: None,
            messages,
            created_at,
            updated_at,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn add_message(&mut self, message: Message) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        self.touch();
        id
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) -> MessageId {
        self.add_message(Message::system(content))
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> MessageId {
        self.add_message(Message::user(content))
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) -> MessageId {
        self.add_message(Message::assistant(content))
    }

    pub fn add_assistant_tool_calls(
        &mut self,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> MessageId {
        self.add_message(Message::assistant_with_tool_calls(content, tool_calls))
    }

    pub fn add_tool_message(
        &mut self,
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        function_name: impl Into<String>,
    ) -> MessageId {
        self.add_message(Message::tool(content, tool_call_id, function_name))
    }

    /// Appends one tool message per result, in order.
    pub fn add_tool_results(&mut self, results: &[ToolResult]) -> Vec<MessageId> {
        results
            .iter()
            .map(|result| {
                self.add_tool_message(
                    result.to_message_content(),
                    result.tool_call_id.clone(),
                    result.function_name.clone(),
                )
            })
            .collect()
    }

    /// The log in the shape the backend expects.
    pub fn get_message_history(&self) -> Vec<BackendMessage> {
        self.messages.iter().map(Message::to_backend).collect()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.touch();
    }

    fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
