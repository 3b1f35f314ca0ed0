//! High-level chat client that owns a conversation and records each turn.
//!
//! The user message is appended as soon as a turn starts. Assistant and tool
//! messages are appended only once the turn completes, so a failed request or
//! a stream dropped before its end leaves nothing but the user message
//! behind.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parley::{
//!     BackendError, BackendFuture, BoxedChunkStream, ChatBackend, ChatClient, ChatRequest,
//!     ChatResponse, Role, VecChunkStream,
//! };
//! use serde_json::json;
//!
//! struct Shout;
//!
//! impl ChatBackend for Shout {
//!     fn name(&self) -> &'static str {
//!         "shout"
//!     }
//!
//!     fn chat<'a>(&'a self, request: ChatRequest) -> BackendFuture<'a, Result<ChatResponse, BackendError>> {
//!         Box::pin(async move {
//!             let last = request.messages.last().map(|m| m.content.to_uppercase()).unwrap_or_default();
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
//! let mut client = ChatClient::builder(Arc::new(Shout))
//!     .model("llama3.2")
//!     .system_message("Answer loudly.")
//!     .build();
//!
//! let reply = client.chat("hello").await.expect("shout backend never fails");
//! assert_eq!(reply, "HELLO");
//! assert_eq!(client.history().len(), 3);
//! assert_eq!(client.history()[2].role, Role::Assistant);
//! # }).expect("shout backend completes immediately");
//! ```

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use serde_json::Value;

use crate::{
    BackendError, BackendMessage, BackendOperationHooks, ChatBackend, ChatError, CoercionPolicy,
    Conversation, ConversationId, ConversationService, ConversationStore, GenerationResponse,
    GenerationStream, MAX_TOKENS_KEY, ModelParameters, SafeBackendHooks, SafeToolHooks, Tool,
    ToolCall, ToolResult, ToolRuntimeHooks, TracingObservabilityHooks, TurnOptions,
};

pub const DEFAULT_MODEL: &str = "gemma2:2b";

/// Final answer of a thinking-enabled turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingReply {
    pub content: String,
    pub thinking: Option<String>,
}

impl ThinkingReply {
    pub fn has_thinking(&self) -> bool {
        self.thinking
            .as_ref()
            .is_some_and(|thinking| !thinking.is_empty())
    }
}

impl From<GenerationResponse> for ThinkingReply {
    fn from(response: GenerationResponse) -> Self {
        Self {
            content: response.content,
            thinking: response.thinking.filter(|thinking| !thinking.is_empty()),
        }
    }
}

pub struct ChatClient {
    conversation: Conversation,
    service: ConversationService,
    parameters: ModelParameters,
    thinking: bool,
    store: Option<Arc<dyn ConversationStore>>,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::builder(backend).build()
    }

    pub fn builder(backend: Arc<dyn ChatBackend>) -> ChatClientBuilder {
        ChatClientBuilder::new(backend)
    }

    /// Client over the Ollama server named by `OLLAMA_HOST`.
    pub fn from_env() -> Result<Self, BackendError> {
        Ok(Self::new(crate::build_backend_from_env()?))
    }

    pub async fn chat(&mut self, message: impl Into<String>) -> Result<String, ChatError> {
        Ok(self.chat_full(message).await?.content)
    }

    pub async fn chat_full(
        &mut self,
        message: impl Into<String>,
    ) -> Result<GenerationResponse, ChatError> {
        let options = self.turn_options(Vec::new(), None, false);
        self.complete_turn(message.into(), options).await
    }

    /// Runs one turn with thinking forced on, whatever the client setting.
    pub async fn chat_with_thinking(
        &mut self,
        message: impl Into<String>,
    ) -> Result<ThinkingReply, ChatError> {
        let options = self.turn_options(Vec::new(), Some(true), false);
        Ok(self.complete_turn(message.into(), options).await?.into())
    }

    /// Offers `tools` and records any tool calls without executing them.
    pub async fn chat_with_tools(
        &mut self,
        message: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<GenerationResponse, ChatError> {
        let options = self.turn_options(tools, None, false);
        self.complete_turn(message.into(), options).await
    }

    pub async fn chat_with_auto_tools(
        &mut self,
        message: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<String, ChatError> {
        Ok(self.chat_with_auto_tools_full(message, tools).await?.content)
    }

    pub async fn chat_with_auto_tools_full(
        &mut self,
        message: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<GenerationResponse, ChatError> {
        let options = self.turn_options(tools, None, true);
        self.complete_turn(message.into(), options).await
    }

    /// Streams the reply. The history is updated once the stream is drained.
    pub async fn stream_chat<'a>(
        &'a mut self,
        message: impl Into<String>,
    ) -> Result<GenerationStream<'a>, ChatError> {
        let options = self.turn_options(Vec::new(), None, false);
        self.stream_turn(message.into(), options).await
    }

    pub async fn stream_chat_with_tools<'a>(
        &'a mut self,
        message: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<GenerationStream<'a>, ChatError> {
        let options = self.turn_options(tools, None, false);
        self.stream_turn(message.into(), options).await
    }

    /// Streams the reply, executing tool calls between the two model passes.
    /// Tool outcomes arrive as deltas carrying `tool_results`.
    pub async fn stream_chat_with_auto_tools<'a>(
        &'a mut self,
        message: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<GenerationStream<'a>, ChatError> {
        let options = self.turn_options(tools, None, true);
        self.stream_turn(message.into(), options).await
    }

    pub fn enable_thinking(&mut self) {
        self.thinking = true;
    }

    pub fn disable_thinking(&mut self) {
        self.thinking = false;
    }

    pub fn is_thinking_enabled(&self) -> bool {
        self.thinking
    }

    pub fn history(&self) -> Vec<BackendMessage> {
        self.conversation.get_message_history()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn clear_history(&mut self) {
        self.conversation.clear();
    }

    pub fn model(&self) -> &str {
        &self.conversation.model
    }

    pub fn service(&self) -> &ConversationService {
        &self.service
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.parameters.set(key, value);
    }

    pub fn temperature(&self) -> Option<f64> {
        self.parameters.temperature()
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.set_parameter("temperature", temperature);
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.parameters.max_tokens()
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.set_parameter(MAX_TOKENS_KEY, max_tokens);
    }

    pub fn top_p(&self) -> Option<f64> {
        self.parameters.top_p()
    }

    pub fn set_top_p(&mut self, top_p: f64) {
        self.set_parameter("top_p", top_p);
    }

    pub fn num_ctx(&self) -> Option<u64> {
        self.parameters.num_ctx()
    }

    pub fn set_num_ctx(&mut self, num_ctx: u32) {
        self.set_parameter("num_ctx", num_ctx);
    }

    /// Writes the current conversation to the configured store.
    pub async fn save(&self) -> Result<(), ChatError> {
        let store = self.require_store()?;
        store.save(&self.conversation).await
    }

    /// Replaces the current conversation with a stored one.
    pub async fn resume(&mut self, id: ConversationId) -> Result<(), ChatError> {
        let store = Arc::clone(self.require_store()?);
        let conversation = store
            .load(id)
            .await?
            .ok_or_else(|| ChatError::store(format!("conversation '{id}' not found")))?;
        self.conversation = conversation;
        Ok(())
    }

    fn require_store(&self) -> Result<&Arc<dyn ConversationStore>, ChatError> {
        self.store
            .as_ref()
            .ok_or_else(|| ChatError::store("no conversation store configured"))
    }

    fn turn_options(
        &self,
        tools: Vec<Arc<dyn Tool>>,
        think: Option<bool>,
        auto_execute: bool,
    ) -> TurnOptions {
        TurnOptions::new(self.parameters.clone())
            .with_tools(tools)
            .with_think(think.or(self.thinking.then_some(true)))
            .auto_execute(auto_execute)
    }

    async fn complete_turn(
        &mut self,
        message: String,
        options: TurnOptions,
    ) -> Result<GenerationResponse, ChatError> {
        self.conversation.add_user_message(message);
        let response = self.service.run_turn(&self.conversation, options).await?;

        TurnRecord::from_response(&response).apply(&mut self.conversation);
        if let Some(store) = &self.store {
            store.save(&self.conversation).await?;
        }
        Ok(response)
    }

    async fn stream_turn<'a>(
        &'a mut self,
        message: String,
        options: TurnOptions,
    ) -> Result<GenerationStream<'a>, ChatError> {
        self.conversation.add_user_message(message);

        let Self {
            conversation,
            service,
            store,
            ..
        } = self;
        let mut deltas = service.stream_turn(&*conversation, options).await?;

        let stream = try_stream! {
            let mut record = TurnRecord::default();
            while let Some(delta) = deltas.next().await {
                let delta = delta?;
                record.observe(&delta);
                yield delta;
            }

            record.apply(conversation);
            if let Some(store) = store.as_ref() {
                store.save(conversation).await?;
            }
        };

        Ok(Box::pin(stream) as GenerationStream<'a>)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("conversation", &self.conversation.id)
            .field("model", &self.conversation.model)
            .field("messages", &self.conversation.len())
            .field("parameters", &self.parameters)
            .field("thinking", &self.thinking)
            .field("store", &self.store.is_some())
            .finish()
    }
}

pub struct ChatClientBuilder {
    backend: Arc<dyn ChatBackend>,
    model: String,
    system_message: Option<String>,
    parameters: ModelParameters,
    thinking: bool,
    store: Option<Arc<dyn ConversationStore>>,
    backend_hooks: Arc<dyn BackendOperationHooks>,
    tool_hooks: Arc<dyn ToolRuntimeHooks>,
    coercion: CoercionPolicy,
}

impl ChatClientBuilder {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            model: DEFAULT_MODEL.to_string(),
            system_message: None,
            parameters: ModelParameters::new(),
            thinking: false,
            store: None,
            backend_hooks: Arc::new(SafeBackendHooks::new(TracingObservabilityHooks)),
            tool_hooks: Arc::new(SafeToolHooks::new(TracingObservabilityHooks)),
            coercion: CoercionPolicy::default(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Seeds the conversation with a system message. It is set once here;
    /// the history offers no way to replace it later.
    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn thinking(mut self, enabled: bool) -> Self {
        self.thinking = enabled;
        self
    }

    /// Saves after every completed turn and enables [`ChatClient::resume`].
    pub fn store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn backend_hooks(mut self, hooks: Arc<dyn BackendOperationHooks>) -> Self {
        self.backend_hooks = hooks;
        self
    }

    pub fn tool_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.tool_hooks = hooks;
        self
    }

    pub fn coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn build(self) -> ChatClient {
        let service = ConversationService::builder(self.backend)
            .with_backend_hooks(self.backend_hooks)
            .with_tool_hooks(self.tool_hooks)
            .with_coercion(self.coercion)
            .build();

        let mut conversation = Conversation::new(self.model);
        if let Some(system_message) = self.system_message {
            conversation.add_system_message(system_message);
        }

        ChatClient {
            conversation,
            service,
            parameters: self.parameters,
            thinking: self.thinking,
            store: self.store,
        }
    }
}

/// Messages a finished turn contributes to the history.
#[derive(Debug, Default)]
struct TurnRecord {
    answer: String,
    tool_calls: Vec<ToolCall>,
    tool_results: Vec<ToolResult>,
}

impl TurnRecord {
    fn from_response(response: &GenerationResponse) -> Self {
        Self {
            answer: response.content.clone(),
            tool_calls: response.tool_calls.clone().unwrap_or_default(),
            tool_results: response.tool_results.clone().unwrap_or_default(),
        }
    }

    /// Text streamed before the first tool result belongs to the tool-call
    /// pass and is dropped, matching the non-streaming shape.
    fn observe(&mut self, delta: &GenerationResponse) {
        if let Some(calls) = &delta.tool_calls {
            self.tool_calls.extend(calls.iter().cloned());
        }
        if let Some(results) = &delta.tool_results {
            if self.tool_results.is_empty() {
                self.answer.clear();
            }
            self.tool_results.extend(results.iter().cloned());
        }
        self.answer.push_str(&delta.content);
    }

    fn apply(self, conversation: &mut Conversation) {
        let answer = self.answer.as_str();
        if !self.tool_results.is_empty() {
            conversation.add_assistant_tool_calls("", self.tool_calls);
            conversation.add_tool_results(&self.tool_results);
            conversation.add_assistant_message(answer);
        } else if !self.tool_calls.is_empty() {
            conversation.add_assistant_tool_calls(answer, self.tool_calls);
        } else {
            conversation.add_assistant_message(answer);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::Role;

    fn call(name: &str, id: &str) -> ToolCall {
        ToolCall::new(name, Map::new()).with_id(id)
    }

    #[test]
    fn plain_turns_record_a_single_assistant_message() {
        let mut conversation = Conversation::new("llama3.2");
        TurnRecord::from_response(&GenerationResponse::new("llama3.2", "Hi there."))
            .apply(&mut conversation);

        let history = conversation.get_message_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[0].content, "Hi there.");
    }

    #[test]
    fn unexecuted_tool_calls_stay_on_the_assistant_message() {
        let mut conversation = Conversation::new("llama3.2");
        let mut response = GenerationResponse::new("llama3.2", "checking");
        response.tool_calls = Some(vec![call("weather", "c1")]);

        TurnRecord::from_response(&response).apply(&mut conversation);

        let history = conversation.get_message_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "checking");
        assert_eq!(history[0].tool_calls.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn resolved_rounds_record_calls_results_and_answer() {
        let mut conversation = Conversation::new("llama3.2");
        let weather = call("weather", "c1");
        let mut response = GenerationResponse::new("llama3.2", "It is sunny.");
        response.tool_calls = Some(vec![weather.clone()]);
        response.tool_results = Some(vec![ToolResult::success(&weather, json!("sunny"))]);

        TurnRecord::from_response(&response).apply(&mut conversation);

        let history = conversation.get_message_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::Assistant);
        assert!(history[0].tool_calls.is_some());
        assert_eq!(history[1].role, Role::Tool);
        assert_eq!(history[1].content, "sunny");
        assert_eq!(history[1].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(history[2].content, "It is sunny.");
    }

    #[test]
    fn observed_deltas_drop_text_from_the_tool_call_pass() {
        let weather = call("weather", "c1");
        let mut record = TurnRecord::default();

        let mut first = GenerationResponse::new("llama3.2", "let me check ");
        first.tool_calls = Some(vec![weather.clone()]);
        record.observe(&first);
        record.observe(&GenerationResponse::tool_result_delta(
            "llama3.2",
            ToolResult::success(&weather, json!("sunny")),
        ));
        record.observe(&GenerationResponse::new("llama3.2", "Sunny"));
        record.observe(&GenerationResponse::new("llama3.2", " today.\n"));

        assert_eq!(record.answer, "Sunny today.\n");
        assert_eq!(record.tool_calls.len(), 1);
        assert_eq!(record.tool_results.len(), 1);

        let mut conversation = Conversation::new("llama3.2");
        record.apply(&mut conversation);
        assert_eq!(
            conversation.last_message().map(|m| m.content.as_str()),
            Some("Sunny today.\n")
        );
    }

    #[test]
    fn thinking_reply_treats_empty_thinking_as_absent() {
        let mut response = GenerationResponse::new("qwen3", "42");
        response.thinking = Some(String::new());
        let reply = ThinkingReply::from(response);

        assert_eq!(reply.thinking, None);
        assert!(!reply.has_thinking());
    }
}
