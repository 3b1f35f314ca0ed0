//! Common imports for most parley applications.

pub use crate::{
    assistant_message, build_backend_from_env, build_ollama_backend, list_models,
    parse_parameters, sync_tool, system_message, tool_message, tool_turn, turn, user_message,
};
pub use crate::{pl_conversation, pl_messages, pl_msg};
pub use crate::{
    BackendBuildConfig, BackendError, BoxFuture, ChatBackend, ChatClient, ChatClientBuilder,
    ChatError, ChatErrorKind, ChatErrorPhase, CoercionPolicy, Conversation, ConversationId,
    ConversationService, ConversationStore, FunctionTool, GenerationResponse, GenerationStream,
    InMemoryConversationStore, Message, ModelParameters, Role, StoreConfig, ThinkingReply, Tool,
    ToolArguments, ToolCall, ToolDefinition, ToolError, ToolRegistry, ToolResult, TurnOptions,
    create_conversation_store,
};
