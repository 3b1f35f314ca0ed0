use std::future::Future;
use std::pin::Pin;

use crate::{BackendError, BoxedChunkStream, ChatRequest, ChatResponse};

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The two primitives an inference backend exposes.
pub trait ChatBackend: Send + Sync {
    /// Short stable name used in hooks and logs.
    fn name(&self) -> &'static str;

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> BackendFuture<'a, Result<ChatResponse, BackendError>>;

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> BackendFuture<'a, Result<BoxedChunkStream<'a>, BackendError>>;
}
