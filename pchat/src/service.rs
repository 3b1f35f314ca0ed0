//! Turn orchestration over a [`ChatBackend`]: request assembly, capability
//! fallback, decoding, and one round of tool resolution, for both
//! non-streaming and streaming turns.

use std::sync::Arc;

use futures_util::StreamExt;
use pbackend::{
    BackendMessage, BoxedChunkStream, ChatBackend, ChatRequest, ChatResponse,
    BackendOperationHooks, NoopOperationHooks, Role, ToolCall, execute_with_fallback,
};
use pcommon::ModelParameters;
use ptooling::{
    CoercionPolicy, NoopToolRuntimeHooks, Tool, ToolRegistry, ToolResult, ToolRuntimeHooks,
};

use crate::decode::{ThinkSplitter, decode_response};
use crate::{
    ChatError, ChatErrorPhase, Conversation, GenerationResponse, GenerationStream, TurnOptions,
};

const CHAT_OPERATION: &str = "chat";
const STREAM_OPERATION: &str = "chat_stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    StreamingInitial,
    ExecutingTools,
    StreamingFinal,
    Done,
}

#[derive(Clone)]
pub struct ConversationService {
    backend: Arc<dyn ChatBackend>,
    backend_hooks: Arc<dyn BackendOperationHooks>,
    tool_hooks: Arc<dyn ToolRuntimeHooks>,
    coercion: CoercionPolicy,
}

impl ConversationService {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::builder(backend).build()
    }

    pub fn builder(backend: Arc<dyn ChatBackend>) -> ConversationServiceBuilder {
        ConversationServiceBuilder::new(backend)
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    pub fn coercion(&self) -> CoercionPolicy {
        self.coercion
    }

    pub async fn generate_response(
        &self,
        conversation: &Conversation,
        parameters: &ModelParameters,
    ) -> Result<GenerationResponse, ChatError> {
        self.run_turn(conversation, TurnOptions::new(parameters.clone()))
            .await
    }

    /// Offers `tools` to the model and returns its tool calls unexecuted.
    pub async fn generate_response_with_tools(
        &self,
        conversation: &Conversation,
        parameters: &ModelParameters,
        tools: Vec<Arc<dyn Tool>>,
        think: Option<bool>,
    ) -> Result<GenerationResponse, ChatError> {
        let options = TurnOptions::new(parameters.clone())
            .with_tools(tools)
            .with_think(think);
        self.run_turn(conversation, options).await
    }

    /// Offers `tools`, executes any calls, and asks the model for a final answer.
    pub async fn generate_response_with_tool_execution(
        &self,
        conversation: &Conversation,
        parameters: &ModelParameters,
        tools: Vec<Arc<dyn Tool>>,
        think: Option<bool>,
    ) -> Result<GenerationResponse, ChatError> {
        let options = TurnOptions::new(parameters.clone())
            .with_tools(tools)
            .with_think(think)
            .auto_execute(true);
        self.run_turn(conversation, options).await
    }

    pub async fn stream_response<'a>(
        &'a self,
        conversation: &Conversation,
        parameters: &ModelParameters,
    ) -> Result<GenerationStream<'a>, ChatError> {
        self.stream_turn(conversation, TurnOptions::new(parameters.clone()))
            .await
    }

    pub async fn stream_response_with_tools<'a>(
        &'a self,
        conversation: &Conversation,
        parameters: &ModelParameters,
        tools: Vec<Arc<dyn Tool>>,
        think: Option<bool>,
        auto_execute: bool,
    ) -> Result<GenerationStream<'a>, ChatError> {
        let options = TurnOptions::new(parameters.clone())
            .with_tools(tools)
            .with_think(think)
            .auto_execute(auto_execute);
        self.stream_turn(conversation, options).await
    }

    /// Runs one non-streaming turn against the conversation's history.
    ///
    /// The conversation itself is never modified; tool-call and tool messages
    /// of a resolved round live only in the request sent to the backend.
    pub async fn run_turn(
        &self,
        conversation: &Conversation,
        options: TurnOptions,
    ) -> Result<GenerationResponse, ChatError> {
        let model = conversation.model.as_str();
        let registry = self.registry(&options);
        let request = self.initial_request(conversation, &options, &registry)?;

        let first = decode_response(&self.chat_with_fallback(&request).await?, model);
        let tool_calls = match &first.tool_calls {
            Some(tool_calls) if options.auto_execute => tool_calls.clone(),
            _ => return Ok(first),
        };

        let tool_results = registry.execute_tool_calls(&tool_calls).await;
        let messages = resolved_history(request.messages, &first.content, &tool_calls, &tool_results);
        let follow_up = follow_up_request(model, messages, &options)?;
        let last = decode_response(&self.chat_with_fallback(&follow_up).await?, model);

        Ok(compose(first, last, tool_calls, tool_results))
    }

    /// Streams one turn as a sequence of [`GenerationResponse`] deltas.
    ///
    /// The initial backend stream is opened before this returns, so request
    /// and connection errors surface here. When tool calls accumulate and
    /// auto-execution is on, the stream continues with one delta per executed
    /// tool followed by the deltas of the follow-up answer.
    pub async fn stream_turn<'a>(
        &'a self,
        conversation: &Conversation,
        options: TurnOptions,
    ) -> Result<GenerationStream<'a>, ChatError> {
        let model = conversation.model.clone();
        let registry = self.registry(&options);
        let request = self
            .initial_request(conversation, &options, &registry)?
            .enable_streaming();
        let mut chunks = self.open_stream(&request).await?;

        let stream = async_stream::try_stream! {
            let mut phase = StreamPhase::StreamingInitial;
            let mut splitter = ThinkSplitter::new();
            let mut content = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();

            loop {
                match phase {
                    StreamPhase::StreamingInitial => match chunks.next().await {
                        Some(chunk) => {
                            let chunk = chunk.map_err(streaming_error)?;
                            let delta = splitter.decode_chunk(&chunk, &model);
                            content.push_str(&delta.content);
                            if let Some(calls) = &delta.tool_calls {
                                tool_calls.extend(calls.iter().cloned());
                            }
                            yield delta;
                        }
                        None => {
                            phase = if options.auto_execute && !tool_calls.is_empty() {
                                StreamPhase::ExecutingTools
                            } else {
                                StreamPhase::Done
                            };
                        }
                    },
                    StreamPhase::ExecutingTools => {
                        let mut tool_results = Vec::with_capacity(tool_calls.len());
                        for tool_call in &tool_calls {
                            let result = registry.execute_tool_call(tool_call).await;
                            tool_results.push(result.clone());
                            yield GenerationResponse::tool_result_delta(model.clone(), result);
                        }

                        let messages = resolved_history(
                            request.messages.clone(),
                            &content,
                            &tool_calls,
                            &tool_results,
                        );
                        let follow_up = follow_up_request(&model, messages, &options)?.enable_streaming();
                        chunks = self
                            .open_stream(&follow_up)
                            .await
                            .map_err(|error| error.with_phase(ChatErrorPhase::Streaming))?;
                        splitter = ThinkSplitter::new();
                        phase = StreamPhase::StreamingFinal;
                    }
                    StreamPhase::StreamingFinal => match chunks.next().await {
                        Some(chunk) => {
                            let chunk = chunk.map_err(streaming_error)?;
                            yield splitter.decode_chunk(&chunk, &model);
                        }
                        None => phase = StreamPhase::Done,
                    },
                    StreamPhase::Done => break,
                }
            }
        };

        Ok(Box::pin(stream) as GenerationStream<'a>)
    }

    fn registry(&self, options: &TurnOptions) -> ToolRegistry {
        ToolRegistry::from_tools(options.tools.iter().cloned())
            .with_coercion(self.coercion)
            .with_hooks(self.tool_hooks.clone())
    }

    fn initial_request(
        &self,
        conversation: &Conversation,
        options: &TurnOptions,
        registry: &ToolRegistry,
    ) -> Result<ChatRequest, ChatError> {
        let request = ChatRequest::new(conversation.model.clone(), conversation.get_message_history())
            .with_options(options.parameters.backend_options())
            .with_tools(registry.schemas())
            .with_think(options.resolved_think());
        checked(request)
    }

    async fn chat_with_fallback(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let backend = self.backend.as_ref();
        execute_with_fallback(
            backend.name(),
            CHAT_OPERATION,
            request.features(),
            self.backend_hooks.as_ref(),
            |features| backend.chat(request.restricted_to(features)),
        )
        .await
        .map_err(|error| ChatError::from(error).with_phase(ChatErrorPhase::Request))
    }

    async fn open_stream<'a>(
        &'a self,
        request: &ChatRequest,
    ) -> Result<BoxedChunkStream<'a>, ChatError> {
        let backend = self.backend.as_ref();
        execute_with_fallback(
            backend.name(),
            STREAM_OPERATION,
            request.features(),
            self.backend_hooks.as_ref(),
            |features| backend.chat_stream(request.restricted_to(features)),
        )
        .await
        .map_err(|error| ChatError::from(error).with_phase(ChatErrorPhase::Request))
    }
}

pub struct ConversationServiceBuilder {
    backend: Arc<dyn ChatBackend>,
    backend_hooks: Arc<dyn BackendOperationHooks>,
    tool_hooks: Arc<dyn ToolRuntimeHooks>,
    coercion: CoercionPolicy,
}

impl ConversationServiceBuilder {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            backend_hooks: Arc::new(NoopOperationHooks),
            tool_hooks: Arc::new(NoopToolRuntimeHooks),
            coercion: CoercionPolicy::default(),
        }
    }

    pub fn with_backend_hooks(mut self, hooks: Arc<dyn BackendOperationHooks>) -> Self {
        self.backend_hooks = hooks;
        self
    }

    pub fn with_tool_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.tool_hooks = hooks;
        self
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn build(self) -> ConversationService {
        ConversationService {
            backend: self.backend,
            backend_hooks: self.backend_hooks,
            tool_hooks: self.tool_hooks,
            coercion: self.coercion,
        }
    }
}

/// Second request of a resolved round: same options, no tools, no thinking.
fn follow_up_request(
    model: &str,
    messages: Vec<BackendMessage>,
    options: &TurnOptions,
) -> Result<ChatRequest, ChatError> {
    checked(ChatRequest::new(model, messages).with_options(options.parameters.backend_options()))
}

fn checked(request: ChatRequest) -> Result<ChatRequest, ChatError> {
    request
        .validate()
        .map_err(|error| ChatError::invalid_request(error.message))?;
    Ok(request)
}

fn resolved_history(
    mut messages: Vec<BackendMessage>,
    content: &str,
    tool_calls: &[ToolCall],
    tool_results: &[ToolResult],
) -> Vec<BackendMessage> {
    messages.push(BackendMessage::new(Role::Assistant, content).with_tool_calls(tool_calls.to_vec()));
    messages.extend(tool_results.iter().map(ToolResult::to_backend_message));
    messages
}

fn compose(
    first: GenerationResponse,
    mut last: GenerationResponse,
    tool_calls: Vec<ToolCall>,
    tool_results: Vec<ToolResult>,
) -> GenerationResponse {
    last.thinking = first.thinking.or(last.thinking);
    last.tool_calls = Some(tool_calls);
    last.tool_results = Some(tool_results);
    last
}

fn streaming_error(error: pbackend::BackendError) -> ChatError {
    ChatError::from(error).with_phase(ChatErrorPhase::Streaming)
}
