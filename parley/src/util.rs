//! Small convenience constructors for common types.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    FunctionTool, Message, ModelParameters, ParameterError, Tool, ToolArguments, ToolDefinition,
    ToolError, TurnOptions,
};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::system(content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::user(content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::assistant(content)
}

pub fn tool_message(
    content: impl Into<String>,
    tool_call_id: impl Into<String>,
    function_name: impl Into<String>,
) -> Message {
    Message::tool(content, tool_call_id, function_name)
}

pub fn turn(parameters: ModelParameters) -> TurnOptions {
    TurnOptions::new(parameters)
}

pub fn tool_turn(parameters: ModelParameters, tools: Vec<Arc<dyn Tool>>) -> TurnOptions {
    TurnOptions::new(parameters)
        .with_tools(tools)
        .auto_execute(true)
}

/// Wraps a synchronous handler as a shareable tool.
pub fn sync_tool<F>(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: Value,
    handler: F,
) -> Arc<dyn Tool>
where
    F: Fn(ToolArguments) -> Result<Value, ToolError> + Send + Sync + 'static,
{
    Arc::new(FunctionTool::from_sync(
        ToolDefinition::new(name, description, parameters),
        handler,
    ))
}

/// Parses `key=value` pairs into parameters. Values that read as JSON keep
/// their type; anything else is stored as a string.
pub fn parse_parameters<'a, I>(pairs: I) -> Result<ModelParameters, ParameterError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parameters = ModelParameters::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ParameterError::Malformed {
                entry: pair.trim().to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ParameterError::Malformed {
                entry: pair.trim().to_string(),
            });
        }
        let value = value.trim();
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        parameters.set(key, value);
    }
    Ok(parameters)
}
