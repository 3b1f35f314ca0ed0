//! Conversation state and turn orchestration over a chat backend.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pbackend::{
//!     BackendError, BackendFuture, BoxedChunkStream, ChatBackend, ChatRequest, ChatResponse,
//!     VecChunkStream,
//! };
//! use pchat::{Conversation, ConversationService};
//! use pcommon::ModelParameters;
//! use serde_json::json;
//!
//! struct Echo;
//!
//! impl ChatBackend for Echo {
//!     fn name(&self) -> &'static str {
//!         "echo"
//!     }
//!
//!     fn chat<'a>(&'a self, request: ChatRequest) -> BackendFuture<'a, Result<ChatResponse, BackendError>> {
//!         Box::pin(async move {
//!             let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
//!             Ok(ChatResponse::from_value(json!({"message": {"content": last}, "done": true})))
//!         })
//!     }
//!
//!     fn chat_stream<'a>(&'a self, _request: ChatRequest) -> BackendFuture<'a, Result<BoxedChunkStream<'a>, BackendError>> {
//!         Box::pin(async move { Ok(Box::pin(VecChunkStream::new(Vec::new())) as BoxedChunkStream<'a>) })
//!     }
//! }
//!
//! # futures_util::FutureExt::now_or_never(async {
//! let service = ConversationService::new(Arc::new(Echo));
//! let mut conversation = Conversation::new("llama3.2");
//! conversation.add_user_message("ping");
//!
//! let response = service
//!     .generate_response(&conversation, &ModelParameters::new())
//!     .await
//!     .expect("echo backend never fails");
//! assert_eq!(response.content, "ping");
//! # }).expect("echo backend completes immediately");
//! ```

mod conversation;
pub mod decode;
mod error;
mod message;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatErrorPhase, ChatFuture, Conversation, ConversationService,
        ConversationServiceBuilder, ConversationStore, GenerationResponse, GenerationStream,
        InMemoryConversationStore, Message, TokenUsage, TurnOptions,
    };
    pub use pcommon::{ConversationId, MessageId, MetadataMap, ModelParameters};
    pub use ptooling::{FunctionTool, Tool, ToolArguments, ToolError, ToolRegistry, ToolResult};
}

pub use conversation::Conversation;
pub use decode::{ThinkSplitter, decode_response, extract_thinking};
pub use error::{ChatError, ChatErrorKind, ChatErrorPhase};
pub use message::{FUNCTION_NAME_KEY, Message};
pub use service::{ConversationService, ConversationServiceBuilder};
pub use store::{ChatFuture, ConversationStore, InMemoryConversationStore};
pub use types::{GenerationResponse, GenerationStream, TokenUsage, TurnOptions};
