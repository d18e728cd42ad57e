//! fennec-core - Core contracts for Fennec deep agents (no I/O deps)
//!
//! This crate holds the types and traits shared by the composition core and
//! the external reasoning loop: the session state schema with its
//! fork/absorb merge policy, the loop and dispatch contracts, model
//! defaulting, checkpointing, and error taxonomy. Tool implementations and
//! the composer itself live in `fennec-tools`.

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod provider;
pub mod state;
pub mod types;

pub use checkpoint::Checkpointer;
pub use engine::{
    fold_dispatch_result, LoopOutcome, LoopRequest, PostStepHook, ReasoningLoop, StepRecord,
    ToolDispatch,
};
pub use error::{AgentError, ToolError};
pub use provider::{LazyModelProvider, ModelProvider, StaticModelProvider};
pub use state::{shared, AgentState, DeepState, FileMap, Shared};
pub use types::{
    AssistantMessage, Message, ModelHandle, SystemMessage, Todo, TodoStatus, ToolCall, ToolDef,
    ToolResult, UserMessage,
};
