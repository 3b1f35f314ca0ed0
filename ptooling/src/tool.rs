//! Tool trait contract for registry-managed capabilities.
//!
//! ```rust
//! use pbackend::ToolDefinition;
//! use ptooling::{FunctionTool, Tool};
//! use serde_json::json;
//!
//! let tool = FunctionTool::new(
//!     ToolDefinition::new("echo", "Echoes input", json!({"type": "object"})),
//!     |args| async move { Ok(json!(args.required_string("text")?)) },
//! );
//!
//! assert_eq!(tool.definition().name, "echo");
//! ```

use std::future::Future;
use std::sync::Arc;

use pbackend::ToolDefinition;
use pcommon::BoxFuture;
use serde_json::Value;

use crate::{ToolArguments, ToolError};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn invoke<'a>(&'a self, arguments: ToolArguments) -> ToolFuture<'a, Result<Value, ToolError>>;
}

type ToolHandler =
    dyn Fn(ToolArguments) -> ToolFuture<'static, Result<Value, ToolError>> + Send + Sync;

/// A tool built from a definition and a closure.
pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> = Arc::new(move |arguments| Box::pin(handler(arguments)));

        Self {
            definition,
            handler,
        }
    }

    pub fn from_sync<F>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self::new(definition, move |arguments| {
            let output = handler(arguments);
            async move { output }
        })
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn invoke<'a>(&'a self, arguments: ToolArguments) -> ToolFuture<'a, Result<Value, ToolError>> {
        (self.handler)(arguments)
    }
}
