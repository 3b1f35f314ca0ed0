use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use pbackend::{BackendError, BackendOperationHooks, FeatureSet, ToolCall};
use ptooling::{ToolError, ToolResult, ToolRuntimeHooks};

/// Swallows panics raised by the wrapped backend hooks.
pub struct SafeBackendHooks<H> {
    inner: H,
}

impl<H> SafeBackendHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> BackendOperationHooks for SafeBackendHooks<H>
where
    H: BackendOperationHooks,
{
    fn on_attempt_start(&self, backend: &str, operation: &str, attempt: u32, features: FeatureSet) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_attempt_start(backend, operation, attempt, features)
        }));
    }

    fn on_capability_fallback(
        &self,
        backend: &str,
        operation: &str,
        from: FeatureSet,
        to: FeatureSet,
        error: &BackendError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_capability_fallback(backend, operation, from, to, error)
        }));
    }

    fn on_success(&self, backend: &str, operation: &str, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(backend, operation, attempts)
        }));
    }

    fn on_failure(&self, backend: &str, operation: &str, attempts: u32, error: &BackendError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(backend, operation, attempts, error)
        }));
    }
}

/// Swallows panics raised by the wrapped tool hooks.
pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_execution_start(&self, tool_call: &ToolCall) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_execution_start(tool_call)));
    }

    fn on_execution_success(&self, tool_call: &ToolCall, result: &ToolResult, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_success(tool_call, result, elapsed)
        }));
    }

    fn on_execution_failure(&self, tool_call: &ToolCall, error: &ToolError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_failure(tool_call, error, elapsed)
        }));
    }
}
