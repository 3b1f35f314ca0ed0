//! Tracing-based observability hooks for backend calls and tool execution.
//!
//! ```rust
//! use pobserve::TracingObservabilityHooks;
//! use ptooling::ToolRuntimeHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_tool_hooks(&hooks);
//! ```

use std::time::Duration;

use pbackend::{BackendError, BackendOperationHooks, FeatureSet, ToolCall};
use ptooling::{ToolError, ToolResult, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl BackendOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, backend: &str, operation: &str, attempt: u32, features: FeatureSet) {
        tracing::info!(
            phase = "backend",
            event = "attempt_start",
            backend,
            operation,
            attempt,
            tools = features.tools,
            think = ?features.think
        );
    }

    fn on_capability_fallback(
        &self,
        backend: &str,
        operation: &str,
        from: FeatureSet,
        to: FeatureSet,
        error: &BackendError,
    ) {
        tracing::warn!(
            phase = "backend",
            event = "capability_fallback",
            backend,
            operation,
            from = ?from,
            to = ?to,
            error_kind = ?error.kind,
            status = error.status,
            error = %error
        );
    }

    fn on_success(&self, backend: &str, operation: &str, attempts: u32) {
        tracing::info!(
            phase = "backend",
            event = "success",
            backend,
            operation,
            attempts
        );
    }

    fn on_failure(&self, backend: &str, operation: &str, attempts: u32, error: &BackendError) {
        tracing::error!(
            phase = "backend",
            event = "failure",
            backend,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            status = error.status,
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_execution_start(&self, tool_call: &ToolCall) {
        tracing::info!(
            phase = "tool",
            event = "execution_start",
            tool_name = tool_call.name(),
            tool_call_id = tool_call.id.as_deref()
        );
    }

    fn on_execution_success(&self, tool_call: &ToolCall, _result: &ToolResult, elapsed: Duration) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_name = tool_call.name(),
            tool_call_id = tool_call.id.as_deref(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(&self, tool_call: &ToolCall, error: &ToolError, elapsed: Duration) {
        tracing::error!(
            phase = "tool",
            event = "execution_failure",
            tool_name = tool_call.name(),
            tool_call_id = tool_call.id.as_deref(),
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            user_error = error.is_user_error(),
            error = %error
        );
    }
}
