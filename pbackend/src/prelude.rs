//! Common `pbackend` imports for downstream crates.

pub use crate::{
    BackendError, BackendErrorKind, BackendFuture, BackendMessage, BackendOperationHooks,
    BoxedChunkStream, ChatBackend, ChatRequest, ChatRequestBuilder, ChatResponse, ChunkStream,
    FeatureSet, NoopOperationHooks, OllamaConfig, ResponseMessage, Role, ToolCall,
    ToolCallFunction, ToolDefinition, ToolSchema, UnsupportedFeatures, VecChunkStream,
    execute_with_fallback,
};
pub use pcommon::{BoxFuture, MetadataMap};

#[cfg(feature = "backend-ollama")]
pub use crate::adapters::ollama::OllamaBackend;
