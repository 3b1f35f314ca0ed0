//! Chunk stream contracts and in-memory stream utilities.
//!
//! ```rust
//! use pbackend::{BoxedChunkStream, ChatResponse, VecChunkStream};
//! use serde_json::json;
//!
//! let chunk = ChatResponse::from_value(json!({"message": {"content": "hel"}, "done": false}));
//! let stream = VecChunkStream::new(vec![Ok(chunk)]);
//! let _boxed: BoxedChunkStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{BackendError, ChatResponse};

/// Streaming reply contract.
///
/// Invariants for consumers:
/// - Chunks are emitted in the order the backend produced them.
/// - Each chunk carries only the text generated since the previous one.
/// - The final chunk has `done == Some(true)` and carries token counts when
///   the backend reports them.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait ChunkStream: Stream<Item = Result<ChatResponse, BackendError>> + Send {}

impl<T> ChunkStream for T where T: Stream<Item = Result<ChatResponse, BackendError>> + Send {}

pub type BoxedChunkStream<'a> = Pin<Box<dyn ChunkStream + 'a>>;

#[derive(Debug)]
pub struct VecChunkStream {
    chunks: VecDeque<Result<ChatResponse, BackendError>>,
}

impl VecChunkStream {
    pub fn new(chunks: Vec<Result<ChatResponse, BackendError>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl Stream for VecChunkStream {
    type Item = Result<ChatResponse, BackendError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<ChatResponse, BackendError>>> {
        Poll::Ready(self.chunks.pop_front())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.chunks.len(), Some(self.chunks.len()))
    }
}
