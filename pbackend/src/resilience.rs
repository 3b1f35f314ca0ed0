//! Capability fallback execution and operational hook contracts.

use std::future::Future;

use crate::{BackendError, FeatureSet};

pub trait BackendOperationHooks: Send + Sync {
    fn on_attempt_start(
        &self,
        _backend: &str,
        _operation: &str,
        _attempt: u32,
        _features: FeatureSet,
    ) {
    }

    fn on_capability_fallback(
        &self,
        _backend: &str,
        _operation: &str,
        _from: FeatureSet,
        _to: FeatureSet,
        _error: &BackendError,
    ) {
    }

    fn on_success(&self, _backend: &str, _operation: &str, _attempts: u32) {}

    fn on_failure(&self, _backend: &str, _operation: &str, _attempts: u32, _error: &BackendError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl BackendOperationHooks for NoopOperationHooks {}

/// Runs `execute` with the `requested` features and, when the backend rejects
/// one of them, retries down [`FeatureSet::fallback_ladder`].
///
/// The first accepted attempt wins. If every rung fails, the error from the
/// original attempt is returned. Errors that do not name an unsupported
/// feature are returned immediately.
pub async fn execute_with_fallback<T, Op, OpFuture>(
    backend: &str,
    operation: &str,
    requested: FeatureSet,
    hooks: &dyn BackendOperationHooks,
    mut execute: Op,
) -> Result<T, BackendError>
where
    Op: FnMut(FeatureSet) -> OpFuture,
    OpFuture: Future<Output = Result<T, BackendError>>,
{
    let mut attempt = 1;
    hooks.on_attempt_start(backend, operation, attempt, requested);

    let original = match execute(requested).await {
        Ok(value) => {
            hooks.on_success(backend, operation, attempt);
            return Ok(value);
        }
        Err(error) => error,
    };

    let ladder = requested.fallback_ladder(original.unsupported_features());
    let mut previous = requested;

    for features in ladder {
        hooks.on_capability_fallback(backend, operation, previous, features, &original);
        attempt += 1;
        hooks.on_attempt_start(backend, operation, attempt, features);

        if let Ok(value) = execute(features).await {
            hooks.on_success(backend, operation, attempt);
            return Ok(value);
        }
        previous = features;
    }

    hooks.on_failure(backend, operation, attempt, &original);
    Err(original)
}
