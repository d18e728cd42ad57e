//! Error types for Fennec agents
//!
//! Only configuration errors escape to the caller as hard failures; every
//! run-time tool and delegation error is a [`ToolError`] that the loop folds
//! into a conversational tool result so the model can self-correct.

use thiserror::Error;

/// Error returned by tool dispatch operations.
///
/// These are recoverable by design: the dispatcher and the reasoning loop
/// fold them into tool-result messages rather than crashing the session.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The requested tool was not found in the assembled set
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    /// The tool arguments failed validation
    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    /// The tool execution failed
    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    /// The tool execution timed out
    #[error("Tool '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },
}

impl ToolError {
    /// Create a new "not found" error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a new "invalid arguments" error
    pub fn invalid_arguments(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "execution failed" error
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Create a new "timeout" error
    pub fn timeout(name: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            name: name.into(),
            timeout_ms,
        }
    }

    /// Stable machine-readable code for result payloads
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "tool_not_found",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Errors surfaced by the external reasoning loop
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model provider failed
    #[error("Model error: {0}")]
    Model(String),

    /// The loop hit its configured step ceiling before reaching a terminal outcome
    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u32 },

    /// Checkpoint save/load failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A tool failure the loop chose to escalate
    #[error(transparent)]
    Tool(#[from] ToolError),
}
