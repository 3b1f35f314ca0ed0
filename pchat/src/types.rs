//! Generation results, per-turn options, and the streaming alias.

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_core::Stream;
use pbackend::ToolCall;
use pcommon::ModelParameters;
use ptooling::{Tool, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Result of one generation. In streaming mode each instance is a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub id: String,
    pub model: String,
    pub content: String,
    pub thinking: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_results: Option<Vec<ToolResult>>,
    pub done: bool,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub created_at: DateTime<Utc>,
    pub raw_response: Option<Value>,
}

impl GenerationResponse {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.into(),
            content: content.into(),
            thinking: None,
            tool_calls: None,
            tool_results: None,
            done: false,
            finish_reason: None,
            usage: None,
            created_at: Utc::now(),
            raw_response: None,
        }
    }

    /// Delta announcing one executed tool.
    pub fn tool_result_delta(model: impl Into<String>, result: ToolResult) -> Self {
        let mut delta = Self::new(model, "");
        delta.tool_results = Some(vec![result]);
        delta
    }

    pub fn has_thinking(&self) -> bool {
        self.thinking.as_ref().is_some_and(|thinking| !thinking.is_empty())
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    pub fn has_tool_results(&self) -> bool {
        self.tool_results
            .as_ref()
            .is_some_and(|results| !results.is_empty())
    }
}

pub type GenerationStream<'a> =
    Pin<Box<dyn Stream<Item = Result<GenerationResponse, crate::ChatError>> + Send + 'a>>;

/// Per-turn knobs for [`ConversationService::run_turn`](crate::ConversationService::run_turn).
#[derive(Clone, Default)]
pub struct TurnOptions {
    pub parameters: ModelParameters,
    pub tools: Vec<Arc<dyn Tool>>,
    pub think: Option<bool>,
    pub auto_execute: bool,
}

impl TurnOptions {
    pub fn new(parameters: ModelParameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_think(mut self, think: Option<bool>) -> Self {
        self.think = think;
        self
    }

    pub fn auto_execute(mut self, auto_execute: bool) -> Self {
        self.auto_execute = auto_execute;
        self
    }

    /// An explicit flag wins over a `think` entry in the parameters.
    pub fn resolved_think(&self) -> Option<bool> {
        self.think.or(self.parameters.think())
    }
}

impl std::fmt::Debug for TurnOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tools = self
            .tools
            .iter()
            .map(|tool| tool.definition().name)
            .collect::<Vec<_>>();

        f.debug_struct("TurnOptions")
            .field("parameters", &self.parameters)
            .field("tools", &tools)
            .field("think", &self.think)
            .field("auto_execute", &self.auto_execute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_think_overrides_parameter() {
        let options = TurnOptions::new(ModelParameters::new().with_think(true));
        assert_eq!(options.resolved_think(), Some(true));
        assert_eq!(options.clone().with_think(Some(false)).resolved_think(), Some(false));
        assert_eq!(TurnOptions::default().resolved_think(), None);
    }

    #[test]
    fn usage_totals_prompt_and_completion() {
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        assert_eq!(usage.total_tokens(), 15);
    }

    #[test]
    fn empty_thinking_does_not_count() {
        let mut response = GenerationResponse::new("m", "hi");
        assert!(!response.has_thinking());
        response.thinking = Some(String::new());
        assert!(!response.has_thinking());
        response.thinking = Some("hmm".to_string());
        assert!(response.has_thinking());
    }
}
