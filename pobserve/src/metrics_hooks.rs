//! Metrics-based observability hooks for backend calls and tool execution.
//!
//! ```rust
//! use pbackend::BackendOperationHooks;
//! use pobserve::MetricsObservabilityHooks;
//!
//! fn accepts_backend_hooks(_hooks: &dyn BackendOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_backend_hooks(&hooks);
//! ```

use std::time::Duration;

use pbackend::{BackendError, BackendOperationHooks, FeatureSet, ToolCall};
use ptooling::{ToolError, ToolResult, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl BackendOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, backend: &str, operation: &str, _attempt: u32, _features: FeatureSet) {
        metrics::counter!(
            "parley_backend_attempt_start_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_capability_fallback(
        &self,
        backend: &str,
        operation: &str,
        from: FeatureSet,
        to: FeatureSet,
        _error: &BackendError,
    ) {
        metrics::counter!(
            "parley_backend_capability_fallback_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string(),
            "dropped_tools" => (from.tools && !to.tools).to_string(),
            "dropped_think" => (from.think.is_some() && to.think.is_none()).to_string()
        )
        .increment(1);
    }

    fn on_success(&self, backend: &str, operation: &str, attempts: u32) {
        metrics::counter!(
            "parley_backend_success_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "parley_backend_attempts_per_success",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(&self, backend: &str, operation: &str, attempts: u32, error: &BackendError) {
        metrics::counter!(
            "parley_backend_failure_total",
            "backend" => backend.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "parley_backend_attempts_per_failure",
            "backend" => backend.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_execution_start(&self, tool_call: &ToolCall) {
        metrics::counter!(
            "parley_tool_execution_start_total",
            "tool_name" => tool_call.name().to_string()
        )
        .increment(1);
    }

    fn on_execution_success(&self, tool_call: &ToolCall, _result: &ToolResult, elapsed: Duration) {
        metrics::counter!(
            "parley_tool_execution_success_total",
            "tool_name" => tool_call.name().to_string()
        )
        .increment(1);
        metrics::histogram!(
            "parley_tool_execution_duration_seconds",
            "tool_name" => tool_call.name().to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_execution_failure(&self, tool_call: &ToolCall, error: &ToolError, elapsed: Duration) {
        metrics::counter!(
            "parley_tool_execution_failure_total",
            "tool_name" => tool_call.name().to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "parley_tool_execution_duration_seconds",
            "tool_name" => tool_call.name().to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}
