//! Observability hooks for backend calls and tool execution.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pbackend::BackendOperationHooks;
//! use pobserve::{MetricsObservabilityHooks, SafeBackendHooks, TracingObservabilityHooks};
//!
//! let backend_hooks: Arc<dyn BackendOperationHooks> =
//!     Arc::new(SafeBackendHooks::new(TracingObservabilityHooks));
//! let _metrics = MetricsObservabilityHooks;
//! # let _ = backend_hooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeBackendHooks, SafeToolHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeBackendHooks, SafeToolHooks, TracingObservabilityHooks,
    };
}
