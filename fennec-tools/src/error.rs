//! Composition errors for Fennec tool assembly.

pub use fennec_core::error::{AgentError, ToolError};
use thiserror::Error;

/// Configuration errors raised while composing an agent.
///
/// These are fatal and surface before any loop runs; they are the only
/// errors that escape to the caller as hard failures.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Two tools in the assembled set share a name
    #[error("Duplicate tool name '{0}' in assembled tool set")]
    DuplicateToolName(String),

    /// A caller-supplied tool uses the reserved delegation tool name
    #[error("Tool name '{0}' is reserved for the delegation tool")]
    ReservedToolName(String),

    /// Two sub-agents share a name
    #[error("Duplicate sub-agent name '{0}'")]
    DuplicateSubAgent(String),

    /// A sub-agent's restricted subset names a tool unknown at compose time
    #[error("Sub-agent '{agent}' references unknown tool '{tool}'")]
    UnknownSubAgentTool { agent: String, tool: String },

    /// A tool's input schema failed to compile as JSON Schema
    #[error("Invalid input schema for tool '{name}': {reason}")]
    InvalidToolSchema { name: String, reason: String },

    /// Neither an explicit model nor a model provider was configured
    #[error("No model configured and no model provider available")]
    NoModel,
}
