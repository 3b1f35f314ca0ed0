//! Capability layer for registering and executing tools.
//!
//! ```rust
//! use pbackend::{ToolCall, ToolDefinition};
//! use ptooling::ToolRegistry;
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let mut registry = ToolRegistry::new();
//! registry.register_sync_fn(
//!     ToolDefinition::new("add", "Add two integers", json!({"type": "object"})),
//!     |args| Ok(json!(args.required_i64("a")? + args.required_i64("b")?)),
//! );
//!
//! let call = ToolCall::new("add", json!({"a": "5", "b": "3"}).as_object().cloned().unwrap_or_default());
//! let result = registry.execute_tool_call(&call).await;
//! assert_eq!(result.result, Some(json!(8)));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(future: F) -> F::Output {
//! #     futures_util::FutureExt::now_or_never(future).expect("sync tool completes immediately")
//! # }
//! ```

mod args;
mod error;
mod hooks;
mod registry;
mod runtime;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        CoercionPolicy, FunctionTool, NoopToolRuntimeHooks, Tool, ToolArguments, ToolError,
        ToolErrorKind, ToolFuture, ToolRegistry, ToolResult, ToolRuntime, ToolRuntimeHooks,
    };
}

pub use args::{
    CoercionPolicy, ToolArguments, coerce_argument, coerce_arguments, parse_json_object,
    parse_json_value,
};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use registry::ToolRegistry;
pub use runtime::ToolRuntime;
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::ToolResult;
