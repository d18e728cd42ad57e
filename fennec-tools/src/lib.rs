//! fennec-tools - Tool assembly and built-in tools for Fennec deep agents
//!
//! This crate composes agents: it normalizes tools, assembles the built-in
//! set (planning, filesystem, delegation), validates the configuration, and
//! hands the result to an external reasoning loop through the contracts in
//! `fennec-core`.
//!
//! ```ignore
//! use fennec_tools::{DeepAgentBuilder, SubAgentSpec, Tool};
//!
//! let agent = DeepAgentBuilder::new(engine)
//!     .model("some-model")
//!     .instructions("You are a research agent.")
//!     .tool(Tool::from_fn("fetch", "Fetch a page", schema, fetch))
//!     .subagent(SubAgentSpec {
//!         name: "critic".into(),
//!         description: "Reviews drafts".into(),
//!         prompt: "Critique the draft you are given.".into(),
//!         tools: Some(vec!["read_file".into()]),
//!     })
//!     .build()?;
//!
//! let outcome = agent.invoke("Research crab supercolonies").await?;
//! ```

pub mod composer;
pub mod dispatcher;
pub mod error;
pub mod fs;
pub mod prompts;
pub mod registry;
pub mod schema;
pub mod sub_agent;
pub mod todos;
pub mod tool;

pub use composer::{DeepAgent, DeepAgentBuilder};
pub use dispatcher::{CompositeDispatcher, FilteredDispatcher};
pub use error::{AgentError, ComposeError, ToolError};
pub use fs::{
    EditFileTool, FsBackend, GlobRequest, GlobTool, GrepRequest, GrepTool, LocalFs, LsTool,
    ReadFileTool, StateFs, StrReplaceEditTool, WriteFileTool,
};
pub use registry::ToolRegistry;
pub use schema::{empty_object_schema, SchemaBuilder};
pub use sub_agent::{ChildDispatcherFactory, SubAgentSpec, TaskTool, TASK_TOOL_NAME};
pub use todos::{WriteTodosTool, WRITE_TODOS_TOOL_NAME};
pub use tool::{Tool, ToolHandler};
