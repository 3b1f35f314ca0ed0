//! Tool registry for lookup by tool definition name.

use std::future::Future;
use std::sync::Arc;

use pbackend::{ToolDefinition, ToolSchema};
use pcommon::Registry;
use serde_json::Value;

use crate::{
    CoercionPolicy, FunctionTool, NoopToolRuntimeHooks, Tool, ToolArguments, ToolError,
    ToolRuntimeHooks,
};

pub struct ToolRegistry {
    tools: Registry<String, Arc<dyn Tool>>,
    pub(crate) coercion: CoercionPolicy,
    pub(crate) hooks: Arc<dyn ToolRuntimeHooks>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            tools: Registry::new(),
            coercion: CoercionPolicy::default(),
            hooks: Arc::new(NoopToolRuntimeHooks),
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a caller-supplied tool list. Later tools with
    /// the same name replace earlier ones.
    pub fn from_tools<I>(tools: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_arc(tool);
        }
        registry
    }

    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn coercion(&self) -> CoercionPolicy {
        self.coercion
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    pub fn register_fn<F, Fut>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.register(FunctionTool::new(definition, handler));
    }

    pub fn register_sync_fn<F>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(ToolArguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register(FunctionTool::from_sync(definition, handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    /// Definitions of every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = self
            .tools
            .values()
            .map(|tool| tool.definition())
            .collect::<Vec<_>>();
        definitions.sort_by(|left, right| left.name.cmp(&right.name));
        definitions
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.definitions()
            .into_iter()
            .map(ToolSchema::function)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
