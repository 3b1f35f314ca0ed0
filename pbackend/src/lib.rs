//! Inference backend boundary: wire types, the [`ChatBackend`] trait, chunk
//! streams, capability fallback, and the Ollama HTTP adapter.
//!
//! ```rust
//! use pbackend::{BackendMessage, ChatRequest, FeatureSet, Role, ToolDefinition};
//! use serde_json::json;
//!
//! let request = ChatRequest::new("llama3.2", vec![BackendMessage::new(Role::User, "Hi")])
//!     .with_tools(vec![ToolDefinition::new("now", "Current time", json!({"type": "object"})).to_schema()])
//!     .with_think(Some(true));
//!
//! assert_eq!(request.features(), FeatureSet { tools: true, think: Some(true) });
//! assert!(request.restricted_to(FeatureSet::none()).tools.is_none());
//! ```

pub mod adapters;
mod backend;
mod capability;
mod config;
mod error;
mod model;
pub mod prelude;
mod resilience;
mod stream;

pub use backend::{BackendFuture, ChatBackend};
pub use capability::{FeatureSet, UnsupportedFeatures};
pub use config::{
    DEFAULT_OLLAMA_HOST, DEFAULT_TIMEOUT, OLLAMA_HOST_ENV, OLLAMA_KEEP_ALIVE_ENV, OllamaConfig,
};
pub use error::{BackendError, BackendErrorKind};
pub use model::{
    BackendMessage, ChatRequest, ChatRequestBuilder, ChatResponse, ResponseMessage, Role,
    ToolCall, ToolCallFunction, ToolDefinition, ToolSchema,
};
pub use resilience::{BackendOperationHooks, NoopOperationHooks, execute_with_fallback};
pub use stream::{BoxedChunkStream, ChunkStream, VecChunkStream};

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;

    use super::*;

    struct FakeBackend;

    impl ChatBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn chat<'a>(
            &'a self,
            request: ChatRequest,
        ) -> BackendFuture<'a, Result<ChatResponse, BackendError>> {
            Box::pin(async move {
                request.validate()?;
                Ok(ChatResponse::from_value(json!({
                    "model": request.model,
                    "message": {"role": "assistant", "content": "hello from backend"},
                    "done": true
                })))
            })
        }

        fn chat_stream<'a>(
            &'a self,
            request: ChatRequest,
        ) -> BackendFuture<'a, Result<BoxedChunkStream<'a>, BackendError>> {
            Box::pin(async move {
                request.validate()?;
                let stream = VecChunkStream::new(vec![
                    Ok(ChatResponse::from_value(json!({"message": {"content": "hello"}}))),
                    Ok(ChatResponse::from_value(
                        json!({"message": {"content": " world"}, "done": true}),
                    )),
                ]);
                Ok(Box::pin(stream) as BoxedChunkStream<'a>)
            })
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("llama3.2", vec![BackendMessage::new(Role::User, "hi")])
    }

    #[tokio::test]
    async fn backend_trait_object_completes_requests() {
        let backend: Box<dyn ChatBackend> = Box::new(FakeBackend);
        let response = backend.chat(request()).await.expect("chat should work");

        assert_eq!(response.model.as_deref(), Some("llama3.2"));
        assert_eq!(response.content(), Some("hello from backend"));
        assert!(response.is_done());
    }

    #[tokio::test]
    async fn backend_stream_yields_chunks_in_order() {
        let backend = FakeBackend;
        let mut stream = backend
            .chat_stream(request().enable_streaming())
            .await
            .expect("stream should open");

        let mut text = String::new();
        let mut done = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.expect("chunk should decode");
            text.push_str(chunk.content().unwrap_or_default());
            done = chunk.is_done();
        }

        assert_eq!(text, "hello world");
        assert!(done);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_dispatch() {
        let error = FakeBackend
            .chat(ChatRequest::new("llama3.2", Vec::new()))
            .await
            .expect_err("empty request should fail");
        assert_eq!(error.kind, BackendErrorKind::InvalidRequest);
    }
}
