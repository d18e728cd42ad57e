//! The `task` delegation tool
//!
//! Runs a registered sub-agent in an isolated nested loop: forked state in,
//! merged state out, and exactly one result message back to the caller. The
//! parent transcript never sees the child's intermediate turns.

use crate::dispatcher::FilteredDispatcher;
use crate::error::ComposeError;
use crate::prompts;
use crate::schema::SchemaBuilder;
use crate::tool::ToolHandler;
use async_trait::async_trait;
use fennec_core::{
    shared, DeepState, LoopOutcome, LoopRequest, ModelHandle, PostStepHook, ReasoningLoop, Shared,
    ToolDef, ToolDispatch, ToolError,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Reserved name of the delegation tool
pub const TASK_TOOL_NAME: &str = "task";

/// Builds the aggregate tool set bound to a given state handle.
///
/// Sub-agent runs need their own copies of the state-backed built-ins so
/// file and todo writes land in the forked state, not the parent's. The
/// composer supplies this factory; the task tool calls it once per
/// delegation with the child handle.
pub type ChildDispatcherFactory<S> =
    Arc<dyn Fn(Shared<S>) -> Result<Arc<dyn ToolDispatch>, ComposeError> + Send + Sync>;

/// Declaration of one sub-agent available through the `task` tool
#[derive(Clone, Debug, Deserialize)]
pub struct SubAgentSpec {
    /// Name the caller selects with `subagent_type`
    pub name: String,
    /// One-line summary shown in the task tool description
    pub description: String,
    /// Full system prompt for the sub-agent's nested run
    pub prompt: String,
    /// Restrict the sub-agent to these tool names; `None` means the full
    /// aggregate set
    #[serde(default)]
    pub tools: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct TaskParams {
    subagent_type: String,
    description: String,
}

/// The `task` tool: dispatches bounded sub-tasks to registered sub-agents
pub struct TaskTool<S: DeepState> {
    subagents: HashMap<String, SubAgentSpec>,
    engine: Arc<dyn ReasoningLoop<S>>,
    model: ModelHandle,
    /// Builds the aggregate set (built-ins plus caller tools, never the task
    /// tool itself, so delegation cannot nest) over a child state handle.
    aggregate: ChildDispatcherFactory<S>,
    state: Shared<S>,
    max_steps: u32,
    post_step: Option<PostStepHook>,
    description: String,
}

impl<S: DeepState> TaskTool<S> {
    pub fn new(
        subagents: Vec<SubAgentSpec>,
        engine: Arc<dyn ReasoningLoop<S>>,
        model: ModelHandle,
        aggregate: ChildDispatcherFactory<S>,
        state: Shared<S>,
        max_steps: u32,
        post_step: Option<PostStepHook>,
    ) -> Self {
        let mut listing = String::from(prompts::TASK_DESCRIPTION_PREFIX);
        if subagents.is_empty() {
            listing.push_str("(none registered)\n");
        }
        for spec in &subagents {
            listing.push_str(&format!("- {}: {}\n", spec.name, spec.description));
        }

        Self {
            subagents: subagents
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
            engine,
            model,
            aggregate,
            state,
            max_steps,
            post_step,
            description: listing,
        }
    }

    fn unknown_subagent(&self, requested: &str) -> ToolError {
        let mut names: Vec<&str> = self.subagents.keys().map(String::as_str).collect();
        names.sort_unstable();
        let available = if names.is_empty() {
            "none are registered".to_string()
        } else {
            format!("available: {}", names.join(", "))
        };
        ToolError::invalid_arguments(
            TASK_TOOL_NAME,
            format!("Unknown sub-agent '{requested}' ({available})"),
        )
    }

    fn dispatcher_for(
        &self,
        spec: &SubAgentSpec,
        child: Shared<S>,
    ) -> Result<Arc<dyn ToolDispatch>, ToolError> {
        // Registration over a pre-validated tool set cannot collide, but the
        // factory keeps the fallible signature rather than asserting that.
        let aggregate = (self.aggregate)(child)
            .map_err(|e| ToolError::execution_failed(e.to_string()))?;
        Ok(match &spec.tools {
            Some(names) => Arc::new(FilteredDispatcher::allow(aggregate, names.iter().cloned())),
            None => aggregate,
        })
    }
}

#[async_trait]
impl<S: DeepState> ToolHandler for TaskTool<S> {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: TASK_TOOL_NAME.to_string(),
            description: self.description.clone(),
            input_schema: SchemaBuilder::new()
                .string("subagent_type", "Name of the sub-agent to run")
                .string("description", "Complete, self-contained task instructions")
                .required("subagent_type")
                .required("description")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: TaskParams = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_arguments(TASK_TOOL_NAME, e.to_string()))?;

        let spec = self
            .subagents
            .get(&params.subagent_type)
            .ok_or_else(|| self.unknown_subagent(&params.subagent_type))?;

        let op_id = uuid::Uuid::now_v7();
        tracing::info!(%op_id, subagent = %spec.name, "delegating to sub-agent");

        // Fork under the read lock, then release it for the whole child run.
        let child = shared(self.state.read().await.fork());

        let request = LoopRequest {
            system_prompt: spec.prompt.clone(),
            model: self.model.clone(),
            dispatcher: self.dispatcher_for(spec, Arc::clone(&child))?,
            state: Arc::clone(&child),
            input: params.description,
            max_steps: self.max_steps,
            post_step: self.post_step.clone(),
        };

        let outcome = match self.engine.run(request).await {
            Ok(outcome) => outcome,
            // Engine failures fold into the result text; the parent state is
            // left exactly as it was.
            Err(err) => LoopOutcome::error(format!("Sub-agent '{}' failed: {err}", spec.name), 0),
        };

        if !outcome.is_error {
            let child = child.read().await;
            self.state.write().await.absorb(&child);
        }

        tracing::info!(
            %op_id,
            steps = outcome.steps,
            is_error = outcome.is_error,
            "sub-agent finished"
        );
        Ok(Value::String(outcome.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use crate::dispatcher::CompositeDispatcher;
    use crate::schema::empty_object_schema;
    use crate::tool::Tool;
    use fennec_core::{AgentError, AgentState, Message, Todo, TodoStatus};
    use serde_json::json;
    use std::sync::Mutex;

    /// Engine that records the requests it receives and writes a canned
    /// result into the child state.
    struct RecordingEngine {
        prompts: Mutex<Vec<String>>,
        result: String,
        file: Option<(String, String)>,
        fail: bool,
    }

    impl RecordingEngine {
        fn returning(result: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                result: result.to_string(),
                file: None,
                fail: false,
            }
        }

        fn writing_file(result: &str, path: &str, content: &str) -> Self {
            Self {
                file: Some((path.to_string(), content.to_string())),
                ..Self::returning(result)
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::returning("")
            }
        }
    }

    #[async_trait]
    impl ReasoningLoop<AgentState> for RecordingEngine {
        async fn run(
            &self,
            request: LoopRequest<AgentState>,
        ) -> Result<LoopOutcome, AgentError> {
            self.prompts.lock().unwrap().push(request.system_prompt.clone());
            if self.fail {
                return Err(AgentError::Model("model unavailable".to_string()));
            }
            let mut state = request.state.write().await;
            state.push_message(Message::user(&request.input));
            state.push_message(Message::assistant(self.result.clone()));
            if let Some((path, content)) = &self.file {
                state.files.insert(path.clone(), content.clone());
            }
            state.todos = vec![Todo {
                content: "child plan".to_string(),
                status: TodoStatus::Completed,
            }];
            Ok(LoopOutcome::success(&self.result, 2))
        }
    }

    fn aggregate() -> ChildDispatcherFactory<AgentState> {
        Arc::new(|_child| {
            let registry = ToolRegistry::from_tools([
                Tool::from_fn("alpha", "a", empty_object_schema(), |_| async { Ok(json!("a")) }),
                Tool::from_fn("beta", "b", empty_object_schema(), |_| async { Ok(json!("b")) }),
            ])?;
            Ok(Arc::new(CompositeDispatcher::new(registry)) as Arc<dyn ToolDispatch>)
        })
    }

    fn spec(name: &str, tools: Option<Vec<String>>) -> SubAgentSpec {
        SubAgentSpec {
            name: name.to_string(),
            description: format!("{name} sub-agent"),
            prompt: format!("You are the {name} sub-agent."),
            tools,
        }
    }

    fn task_tool(
        subagents: Vec<SubAgentSpec>,
        engine: Arc<RecordingEngine>,
        state: Shared<AgentState>,
    ) -> TaskTool<AgentState> {
        TaskTool::new(
            subagents,
            engine,
            ModelHandle::from("test-model"),
            aggregate(),
            state,
            10,
            None,
        )
    }

    #[tokio::test]
    async fn runs_subagent_with_its_own_prompt() {
        let engine = Arc::new(RecordingEngine::returning("research summary"));
        let state = shared(AgentState::default());
        let tool = task_tool(vec![spec("researcher", None)], Arc::clone(&engine), state);

        let out = tool
            .call(json!({"subagent_type": "researcher", "description": "find facts"}))
            .await
            .unwrap();
        assert_eq!(out, json!("research summary"));

        let prompts = engine.prompts.lock().unwrap();
        assert_eq!(prompts.as_slice(), ["You are the researcher sub-agent."]);
    }

    #[tokio::test]
    async fn child_transcript_never_reaches_parent() {
        let engine = Arc::new(RecordingEngine::writing_file("done", "out.md", "result"));
        let state = shared(AgentState {
            messages: vec![Message::user("parent turn")],
            ..AgentState::default()
        });
        let tool = task_tool(vec![spec("writer", None)], engine, Arc::clone(&state));

        tool.call(json!({"subagent_type": "writer", "description": "write"}))
            .await
            .unwrap();

        let parent = state.read().await;
        // Only the pre-existing parent turn; child messages were dropped on merge.
        assert_eq!(parent.messages.len(), 1);
        // File writes and the plan do come back.
        assert_eq!(parent.files["out.md"], "result");
        assert_eq!(parent.todos[0].content, "child plan");
    }

    #[tokio::test]
    async fn unknown_subagent_lists_alternatives() {
        let engine = Arc::new(RecordingEngine::returning("x"));
        let state = shared(AgentState::default());
        let tool = task_tool(
            vec![spec("writer", None), spec("reviewer", None)],
            engine,
            state,
        );

        let err = tool
            .call(json!({"subagent_type": "editor", "description": "y"}))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Unknown sub-agent 'editor'"));
        assert!(text.contains("reviewer, writer"));
    }

    #[tokio::test]
    async fn unknown_subagent_with_empty_registry() {
        let engine = Arc::new(RecordingEngine::returning("x"));
        let state = shared(AgentState::default());
        let tool = task_tool(vec![], engine, Arc::clone(&state));

        let err = tool
            .call(json!({"subagent_type": "researcher", "description": "y"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("none are registered"));
        assert!(state.read().await.files.is_empty());
    }

    #[tokio::test]
    async fn restricted_subagent_sees_only_its_subset() {
        let engine = Arc::new(RecordingEngine::returning("ok"));
        let state = shared(AgentState::default());
        let tool = TaskTool::new(
            vec![spec("scoped", Some(vec!["alpha".to_string()]))],
            Arc::clone(&engine) as Arc<dyn ReasoningLoop<AgentState>>,
            ModelHandle::from("test-model"),
            aggregate(),
            state,
            10,
            None,
        );

        let spec = tool.subagents.get("scoped").unwrap();
        let child = shared(AgentState::default());
        let dispatcher = tool.dispatcher_for(spec, child).unwrap();
        let names: Vec<String> = dispatcher.tools().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, ["alpha"]);
        assert!(dispatcher.dispatch("beta", &json!({})).await.is_err());
    }

    #[tokio::test]
    async fn engine_failure_folds_into_result_and_skips_merge() {
        let engine = Arc::new(RecordingEngine::failing());
        let state = shared(AgentState {
            todos: vec![Todo {
                content: "parent plan".to_string(),
                status: TodoStatus::Pending,
            }],
            ..AgentState::default()
        });
        let tool = task_tool(vec![spec("flaky", None)], engine, Arc::clone(&state));

        let out = tool
            .call(json!({"subagent_type": "flaky", "description": "try"}))
            .await
            .unwrap();
        assert!(out.as_str().unwrap().contains("Sub-agent 'flaky' failed"));

        // Parent plan untouched by the failed run.
        let parent = state.read().await;
        assert_eq!(parent.todos[0].content, "parent plan");
    }

    #[tokio::test]
    async fn task_description_lists_subagents() {
        let engine = Arc::new(RecordingEngine::returning("x"));
        let state = shared(AgentState::default());
        let tool = task_tool(
            vec![spec("writer", None), spec("reviewer", None)],
            engine,
            state,
        );

        let def = tool.def();
        assert_eq!(def.name, TASK_TOOL_NAME);
        assert!(def.description.contains("- writer: writer sub-agent"));
        assert!(def.description.contains("- reviewer: reviewer sub-agent"));
    }
}
