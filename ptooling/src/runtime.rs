//! Registry-backed execution of model-issued tool calls.
//!
//! Execution never fails: lookup errors, tool errors, and panics inside a tool
//! all come back as a [`ToolResult`] carrying `error`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use futures_util::FutureExt;
use pbackend::ToolCall;
use serde_json::Value;

use crate::{ToolArguments, ToolError, ToolFuture, ToolRegistry, ToolResult};

pub trait ToolRuntime: Send + Sync {
    fn execute<'a>(&'a self, tool_call: &'a ToolCall) -> ToolFuture<'a, ToolResult>;
}

impl ToolRegistry {
    pub async fn execute_tool_call(&self, tool_call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        self.hooks.on_execution_start(tool_call);

        let outcome = self.invoke(tool_call).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(value) => {
                let result = ToolResult::success(tool_call, value).with_execution_time(elapsed);
                self.hooks.on_execution_success(tool_call, &result, elapsed);
                result
            }
            Err(error) => {
                let message = error.message.clone();
                let mut error = error.with_tool_name(tool_call.name());
                if let Some(id) = &tool_call.id {
                    error = error.with_tool_call_id(id.clone());
                }
                self.hooks.on_execution_failure(tool_call, &error, elapsed);
                ToolResult::failure(tool_call, message).with_execution_time(elapsed)
            }
        }
    }

    /// Runs each call in order. A failing call does not stop the rest.
    pub async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(tool_calls.len());
        for tool_call in tool_calls {
            results.push(self.execute_tool_call(tool_call).await);
        }
        results
    }

    async fn invoke(&self, tool_call: &ToolCall) -> Result<Value, ToolError> {
        let name = tool_call.name();
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::not_found(format!("function '{name}' not found")))?;

        let arguments =
            ToolArguments::new(tool_call.function.arguments.clone()).coerced(self.coercion);

        let future = panic::catch_unwind(AssertUnwindSafe(|| tool.invoke(arguments)))
            .map_err(panic_error)?;
        AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .map_err(panic_error)?
    }
}

impl ToolRuntime for ToolRegistry {
    fn execute<'a>(&'a self, tool_call: &'a ToolCall) -> ToolFuture<'a, ToolResult> {
        Box::pin(self.execute_tool_call(tool_call))
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> ToolError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    ToolError::panicked(format!("tool panicked: {detail}"))
}
