//! Unified facade over the parley workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core parley crates and provides [`ChatClient`], backend
//! construction from configuration or the environment, and a few macros for
//! building messages.
//!
//! ```rust,no_run
//! use parley::ChatClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = ChatClient::builder(parley::build_backend_from_env()?)
//!     .model("qwen3")
//!     .thinking(true)
//!     .build();
//!
//! let reply = client.chat_with_thinking("Why is the sky blue?").await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

mod backends;
mod client;
mod macros;

pub mod prelude;
pub mod util;

pub use pbackend;
pub use pchat;
pub use pcommon;
pub use pmemory;
pub use pobserve;
pub use ptooling;

pub use pbackend::{
    BackendError, BackendErrorKind, BackendFuture, BackendMessage, BackendOperationHooks,
    BoxedChunkStream, ChatBackend, ChatRequest, ChatResponse, DEFAULT_OLLAMA_HOST,
    DEFAULT_TIMEOUT, FeatureSet, NoopOperationHooks, OLLAMA_HOST_ENV, OLLAMA_KEEP_ALIVE_ENV,
    OllamaConfig, Role, ToolCall, ToolDefinition, VecChunkStream, execute_with_fallback,
};
pub use pchat::{
    ChatError, ChatErrorKind, ChatErrorPhase, Conversation, ConversationService,
    ConversationServiceBuilder, ConversationStore, GenerationResponse, GenerationStream,
    InMemoryConversationStore, Message, ThinkSplitter, TokenUsage, TurnOptions,
    decode_response, extract_thinking,
};
pub use pcommon::{
    BoxFuture, ConversationId, MAX_TOKENS_KEY, MessageId, MetadataMap, ModelParameters,
    ParameterError,
};
pub use pmemory::{
    FilesystemConversationStore, MemoryError, MemoryErrorKind, SqliteConversationStore,
    StoreConfig, create_conversation_store, create_default_conversation_store,
};
pub use pobserve::{
    MetricsObservabilityHooks, SafeBackendHooks, SafeToolHooks, TracingObservabilityHooks,
};
pub use ptooling::{
    CoercionPolicy, FunctionTool, NoopToolRuntimeHooks, Tool, ToolArguments, ToolError,
    ToolErrorKind, ToolFuture, ToolRegistry, ToolResult, ToolRuntime, ToolRuntimeHooks,
};

#[cfg(feature = "backend-ollama")]
pub use pbackend::adapters::ollama::OllamaBackend;

pub use backends::{BackendBuildConfig, build_backend_from_env, build_ollama_backend, list_models};
pub use client::{ChatClient, ChatClientBuilder, DEFAULT_MODEL, ThinkingReply};
pub use util::{
    assistant_message, parse_parameters, sync_tool, system_message, tool_message, tool_turn, turn,
    user_message,
};
