//! Contracts between the composition core and the external reasoning loop
//!
//! The loop that alternates model calls with tool execution is an external
//! collaborator. This module fixes its invoke contract: the composer hands
//! it a [`LoopRequest`] (prompt, model, dispatcher, shared state, step
//! ceiling) and receives a terminal [`LoopOutcome`]. The sub-agent
//! dispatcher constructs nested requests through the same contract.

use crate::error::{AgentError, ToolError};
use crate::state::{DeepState, Shared};
use crate::types::{ModelHandle, ToolCall, ToolDef, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Trait for tool dispatchers.
///
/// The loop only sees this surface: the definitions to advertise to the
/// model, and a dispatch entry point. Errors are recoverable and meant to be
/// folded into tool results.
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    /// Get available tool definitions, in registration order
    fn tools(&self) -> Vec<Arc<ToolDef>>;

    /// Execute a tool call.
    ///
    /// Returns the tool result as a JSON value; the loop stringifies it when
    /// building the transcript entry.
    async fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError>;
}

/// Record handed to the post-step hook after each model step
#[derive(Clone, Debug)]
pub struct StepRecord {
    /// 1-based step index within the current loop run
    pub step: u32,
    /// Assistant text produced in this step
    pub content: String,
    /// Tool calls the model requested in this step
    pub tool_calls: Vec<ToolCall>,
}

/// Hook invoked by the loop after every model step
pub type PostStepHook = Arc<dyn Fn(&StepRecord) + Send + Sync>;

/// One fully-resolved run for the reasoning loop to execute.
///
/// Nested sub-agent runs use the same shape with a different prompt,
/// dispatcher, and a forked state handle.
pub struct LoopRequest<S: DeepState> {
    /// Complete system prompt for this run
    pub system_prompt: String,
    /// Model to drive the run with
    pub model: ModelHandle,
    /// Assembled tool set for this run
    pub dispatcher: Arc<dyn ToolDispatch>,
    /// Session state the run reads and mutates
    pub state: Shared<S>,
    /// Task text seeding the transcript
    pub input: String,
    /// Ceiling on model/tool alternations before the loop must stop
    pub max_steps: u32,
    /// Optional hook called after each step
    pub post_step: Option<PostStepHook>,
}

/// Terminal outcome of a loop run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Final result text (or error text when `is_error`)
    pub result: String,
    /// Whether the run ended in an error the loop folded into text
    pub is_error: bool,
    /// Number of steps the run took
    pub steps: u32,
}

impl LoopOutcome {
    /// Successful terminal outcome
    pub fn success(result: impl Into<String>, steps: u32) -> Self {
        Self {
            result: result.into(),
            is_error: false,
            steps,
        }
    }

    /// Error outcome folded into result text
    pub fn error(result: impl Into<String>, steps: u32) -> Self {
        Self {
            result: result.into(),
            is_error: true,
            steps,
        }
    }
}

/// The external model/tool alternation engine.
///
/// Implementations own scheduling entirely: each iteration may issue zero or
/// more tool calls through the request's dispatcher and append turns to the
/// request's state. Delegation is a blocking call from the caller's
/// perspective; cancellation inherits from task cancellation.
#[async_trait]
pub trait ReasoningLoop<S: DeepState>: Send + Sync {
    /// Drive model/tool alternation to a terminal outcome
    async fn run(&self, request: LoopRequest<S>) -> Result<LoopOutcome, AgentError>;
}

/// Fold a dispatch result into the tool-result turn the loop records.
///
/// Success payloads are stringified (bare strings without JSON quoting);
/// errors become error-flagged results, never exceptions.
pub fn fold_dispatch_result(call: &ToolCall, outcome: Result<Value, ToolError>) -> ToolResult {
    match outcome {
        Ok(Value::String(text)) => ToolResult::from_call(call, text, false),
        Ok(value) => ToolResult::from_call(call, value.to_string(), false),
        Err(err) => ToolResult::from_call(call, err.to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fold_stringifies_payloads() {
        let call = ToolCall::new("c1", "ls", json!({}));

        let ok = fold_dispatch_result(&call, Ok(json!("plain text")));
        assert_eq!(ok.content, "plain text");
        assert!(!ok.is_error);

        let obj = fold_dispatch_result(&call, Ok(json!({"count": 2})));
        assert_eq!(obj.content, r#"{"count":2}"#);

        let err = fold_dispatch_result(&call, Err(ToolError::not_found("ls")));
        assert!(err.is_error);
        assert_eq!(err.content, "Tool not found: ls");
        assert_eq!(err.call_id, "c1");
    }
}
