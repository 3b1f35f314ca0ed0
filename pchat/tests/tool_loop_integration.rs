use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use pbackend::{
    BackendError, BackendFuture, BackendOperationHooks, BoxedChunkStream, ChatBackend,
    ChatRequest, ChatResponse, FeatureSet, Role, ToolCall, ToolDefinition, VecChunkStream,
};
use pchat::prelude::*;
use ptooling::{CoercionPolicy, ToolRuntimeHooks};
use serde_json::{Value, json};

/// Asks for `echo` until the history carries a tool message, then answers
/// with the tool output.
struct ToolLoopBackend {
    requests: Mutex<Vec<ChatRequest>>,
}

impl ToolLoopBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
        })
    }

    fn reply(&self, request: ChatRequest) -> Value {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        match request.messages.iter().rev().find(|m| m.role == Role::Tool) {
            Some(tool_message) => json!({
                "model": request.model,
                "message": {"role": "assistant", "content": format!("echoed {}", tool_message.content)},
                "done": true,
                "done_reason": "stop"
            }),
            None => json!({
                "model": request.model,
                "message": {
                    "role": "assistant",
                    "content": "<think>the user wants an echo</think>",
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {"name": "echo", "arguments": {"text": "hello", "times": "2"}}
                    }]
                },
                "done": true
            }),
        }
    }
}

impl ChatBackend for ToolLoopBackend {
    fn name(&self) -> &'static str {
        "tool-loop"
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> BackendFuture<'a, Result<ChatResponse, BackendError>> {
        Box::pin(async move { Ok(ChatResponse::from_value(self.reply(request))) })
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> BackendFuture<'a, Result<BoxedChunkStream<'a>, BackendError>> {
        Box::pin(async move {
            let reply = ChatResponse::from_value(self.reply(request));
            Ok(Box::pin(VecChunkStream::new(vec![Ok(reply)])) as BoxedChunkStream<'a>)
        })
    }
}

#[derive(Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn push(&self, event: String) {
        self.events.lock().expect("events lock").push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }
}

impl BackendOperationHooks for RecordingHooks {
    fn on_attempt_start(&self, backend: &str, operation: &str, attempt: u32, _features: FeatureSet) {
        self.push(format!("attempt:{backend}:{operation}:{attempt}"));
    }

    fn on_success(&self, _backend: &str, operation: &str, _attempts: u32) {
        self.push(format!("success:{operation}"));
    }
}

impl ToolRuntimeHooks for RecordingHooks {
    fn on_execution_start(&self, tool_call: &ToolCall) {
        self.push(format!("tool_start:{}", tool_call.name()));
    }

    fn on_execution_success(&self, tool_call: &ToolCall, _result: &ToolResult, _elapsed: Duration) {
        self.push(format!("tool_success:{}", tool_call.name()));
    }

    fn on_execution_failure(&self, tool_call: &ToolCall, _error: &ToolError, _elapsed: Duration) {
        self.push(format!("tool_failure:{}", tool_call.name()));
    }
}

fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FunctionTool::from_sync(
        ToolDefinition::new(
            "echo",
            "Repeats text",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}, "times": {"type": "integer"}},
                "required": ["text"]
            }),
        ),
        |args| {
            let text = args.required_string("text")?;
            let times = args.required_i64("times")?;
            Ok(Value::String(
                std::iter::repeat_n(text.as_str(), times as usize).collect::<Vec<_>>().join(" "),
            ))
        },
    ))
}

fn conversation() -> Conversation {
    let mut conversation = Conversation::new("qwen3");
    conversation.add_user_message("echo hello twice");
    conversation
}

#[tokio::test]
async fn resolved_round_runs_the_tool_and_reports_hooks() {
    let backend = ToolLoopBackend::new();
    let hooks = Arc::new(RecordingHooks::default());
    let service = ConversationService::builder(backend.clone())
        .with_backend_hooks(hooks.clone())
        .with_tool_hooks(hooks.clone())
        .build();

    let response = service
        .generate_response_with_tool_execution(
            &conversation(),
            &ModelParameters::new().with_temperature(0.2),
            vec![echo_tool()],
            None,
        )
        .await
        .expect("turn should succeed");

    assert_eq!(response.content, "echoed hello hello");
    assert_eq!(response.thinking.as_deref(), Some("the user wants an echo"));
    assert_eq!(response.tool_calls.as_ref().map(Vec::len), Some(1));
    let results = response.tool_results.as_ref().expect("tool results");
    assert_eq!(results[0].tool_call_id, "call_1");
    assert_eq!(results[0].result, Some(json!("hello hello")));

    assert_eq!(
        hooks.events(),
        vec![
            "attempt:tool-loop:chat:1",
            "success:chat",
            "tool_start:echo",
            "tool_success:echo",
            "attempt:tool-loop:chat:1",
            "success:chat",
        ]
    );

    let requests = backend.requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages[2].tool_call_id.as_deref(), Some("call_1"));
}

#[tokio::test]
async fn disabled_coercion_surfaces_as_a_tool_error_result() {
    let backend = ToolLoopBackend::new();
    let hooks = Arc::new(RecordingHooks::default());
    let service = ConversationService::builder(backend)
        .with_tool_hooks(hooks.clone())
        .with_coercion(CoercionPolicy::Disabled)
        .build();

    let response = service
        .generate_response_with_tool_execution(
            &conversation(),
            &ModelParameters::new(),
            vec![echo_tool()],
            None,
        )
        .await
        .expect("tool errors never fail the turn");

    let results = response.tool_results.expect("tool results");
    assert!(results[0].error.is_some());
    assert_eq!(results[0].result, None);
    assert!(response.content.starts_with("echoed Error executing echo:"));
    assert!(hooks.events().contains(&"tool_failure:echo".to_string()));
}

#[tokio::test]
async fn streamed_round_matches_the_synchronous_result() {
    let backend = ToolLoopBackend::new();
    let service = ConversationService::new(backend);
    let history = conversation();

    let sync = service
        .generate_response_with_tool_execution(
            &history,
            &ModelParameters::new(),
            vec![echo_tool()],
            None,
        )
        .await
        .expect("sync turn");

    let deltas: Vec<GenerationResponse> = service
        .stream_response_with_tools(
            &history,
            &ModelParameters::new(),
            vec![echo_tool()],
            None,
            true,
        )
        .await
        .expect("stream should open")
        .map(|delta| delta.expect("delta"))
        .collect()
        .await;

    let streamed_results: Vec<ToolResult> = deltas
        .iter()
        .filter_map(|delta| delta.tool_results.clone())
        .flatten()
        .collect();
    let final_content: String = deltas
        .iter()
        .skip_while(|delta| !delta.has_tool_results())
        .map(|delta| delta.content.as_str())
        .collect();

    assert_eq!(final_content, sync.content);
    assert_eq!(streamed_results.len(), 1);
    assert_eq!(streamed_results[0].result, sync.tool_results.expect("sync results")[0].result);
    assert_eq!(deltas[0].thinking.as_deref(), Some("the user wants an echo"));
}
