//! Core types for Fennec
//!
//! These types form the representation boundary between the composition core
//! and the external reasoning loop: conversation messages, tool definitions,
//! tool calls/results, and plan (todo) items.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Handle naming a model as understood by the external loop's provider.
///
/// The composition core never interprets the handle; it is carried verbatim
/// into every [`crate::engine::LoopRequest`], nested dispatches included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelHandle(pub String);

impl ModelHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModelHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a plan item in its lifecycle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")] // for Serialize
pub enum TodoStatus {
    /// Item is waiting to be started
    #[default]
    Pending,
    /// Item is actively being worked on
    InProgress,
    /// Item has been finished
    Completed,
}

impl<'de> Deserialize<'de> for TodoStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(serde::de::Error::custom(format!(
                "Invalid status: {other}. Must be pending, in_progress, or completed"
            ))),
        }
    }
}

/// A single plan item. The plan is only ever replaced wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// What needs to be done
    pub content: String,
    /// Current status
    #[serde(default)]
    pub status: TodoStatus,
}

impl Todo {
    pub fn new(content: impl Into<String>, status: TodoStatus) -> Self {
        Self {
            content: content.into(),
            status,
        }
    }
}

/// Tool definition surfaced to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Unique name within an assembled tool set
    pub name: String,
    /// Description the model uses to decide when to call the tool
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub input_schema: Value,
}

/// A tool invocation requested by the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back in the result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments as JSON
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Result of a tool invocation, appended to the transcript by the loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this result answers
    pub call_id: String,
    /// Stringified tool output (or error text when `is_error`)
    pub content: String,
    /// Whether the tool failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Build a result from a call and its output
    pub fn from_call(call: &ToolCall, content: impl Into<String>, is_error: bool) -> Self {
        Self {
            call_id: call.id.clone(),
            content: content.into(),
            is_error,
        }
    }
}

/// System message content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub content: String,
}

/// User message content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: String,
}

/// Assistant message content, possibly carrying tool calls
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// A turn in a conversation transcript.
///
/// Transcripts are session-scoped: they never cross the delegation boundary.
/// A sub-agent starts with an empty transcript and only a single synthesized
/// result string flows back to the parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolResults { results: Vec<ToolResult> },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(SystemMessage {
            content: content.into(),
        })
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User(UserMessage {
            content: content.into(),
        })
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            content: content.into(),
            tool_calls: Vec::new(),
        })
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self::ToolResults { results }
    }
}
