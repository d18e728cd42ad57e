//! Agent composition: builder, built-in assembly, and the composed agent
//!
//! [`DeepAgentBuilder`] assembles instructions, caller tools, sub-agents,
//! and a filesystem mode into a [`DeepAgent`] bound to an external
//! reasoning loop. All configuration errors surface here, at build time;
//! once `build` returns, every invoke works off a validated tool set.

use crate::dispatcher::CompositeDispatcher;
use crate::error::ComposeError;
use crate::fs::{
    EditFileTool, FsBackend, GlobTool, GrepTool, LocalFs, LsTool, ReadFileTool, StateFs,
    StrReplaceEditTool, WriteFileTool,
};
use crate::prompts;
use crate::registry::ToolRegistry;
use crate::sub_agent::{ChildDispatcherFactory, SubAgentSpec, TaskTool, TASK_TOOL_NAME};
use crate::todos::WriteTodosTool;
use crate::tool::Tool;
use fennec_core::{
    shared, AgentError, AgentState, Checkpointer, DeepState, LoopOutcome, LoopRequest,
    ModelHandle, ModelProvider, PostStepHook, ReasoningLoop, Shared, ToolDispatch,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_STEPS: u32 = 100;

/// Builder for a composed deep agent.
///
/// The only required input is the reasoning loop; everything else has a
/// usable default (no caller tools, no sub-agents, virtual filesystem,
/// fresh state).
pub struct DeepAgentBuilder<S: DeepState = AgentState> {
    engine: Arc<dyn ReasoningLoop<S>>,
    tools: Vec<Tool>,
    instructions: String,
    model: Option<ModelHandle>,
    model_provider: Option<Arc<dyn ModelProvider>>,
    subagents: Vec<SubAgentSpec>,
    local_filesystem: bool,
    state: Option<S>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    post_step: Option<PostStepHook>,
    max_steps: u32,
    tool_timeout: Option<Duration>,
}

impl<S: DeepState> DeepAgentBuilder<S> {
    pub fn new(engine: Arc<dyn ReasoningLoop<S>>) -> Self {
        Self {
            engine,
            tools: Vec::new(),
            instructions: String::new(),
            model: None,
            model_provider: None,
            subagents: Vec::new(),
            local_filesystem: false,
            state: None,
            checkpointer: None,
            post_step: None,
            max_steps: DEFAULT_MAX_STEPS,
            tool_timeout: None,
        }
    }

    /// Domain instructions; the operational suffix is appended after them
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Add a caller tool
    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add caller tools in order
    pub fn tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Pin the model explicitly, bypassing any provider
    pub fn model(mut self, model: impl Into<ModelHandle>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Resolve the model through a provider when none is pinned
    pub fn model_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.model_provider = Some(provider);
        self
    }

    /// Register a sub-agent reachable through the `task` tool
    pub fn subagent(mut self, spec: SubAgentSpec) -> Self {
        self.subagents.push(spec);
        self
    }

    /// Register sub-agents in order
    pub fn subagents(mut self, specs: impl IntoIterator<Item = SubAgentSpec>) -> Self {
        self.subagents.extend(specs);
        self
    }

    /// Use the host filesystem instead of the virtual file table
    pub fn local_filesystem(mut self, enabled: bool) -> Self {
        self.local_filesystem = enabled;
        self
    }

    /// Seed the session with existing state
    pub fn state(mut self, state: S) -> Self {
        self.state = Some(state);
        self
    }

    /// Persist state through a checkpointer after each invoke
    pub fn checkpointer<C: Checkpointer<S> + 'static>(mut self, checkpointer: Arc<C>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Hook called after every model step, in nested runs too
    pub fn post_step(mut self, hook: PostStepHook) -> Self {
        self.post_step = Some(hook);
        self
    }

    /// Ceiling on model/tool alternations per run
    pub fn max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Per-call tool timeout. Applies to every dispatch, delegations
    /// through the `task` tool included, so size it for the slowest
    /// sub-agent run when sub-agents are registered.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    fn validate_subagents(&self, known_tools: &HashSet<String>) -> Result<(), ComposeError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for spec in &self.subagents {
            if !seen.insert(spec.name.as_str()) {
                return Err(ComposeError::DuplicateSubAgent(spec.name.clone()));
            }
            if let Some(tools) = &spec.tools {
                for tool in tools {
                    if !known_tools.contains(tool) {
                        return Err(ComposeError::UnknownSubAgentTool {
                            agent: spec.name.clone(),
                            tool: tool.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Assemble the agent, surfacing any configuration error
    pub fn build(mut self) -> Result<DeepAgent<S>, ComposeError> {
        let model = match (&self.model, &self.model_provider) {
            (Some(model), _) => model.clone(),
            (None, Some(provider)) => provider.default_model(),
            (None, None) => return Err(ComposeError::NoModel),
        };

        let state = shared(self.state.take().unwrap_or_default());

        // Caller tools may not claim the delegation tool's name.
        for tool in &self.tools {
            if tool.name() == TASK_TOOL_NAME {
                return Err(ComposeError::ReservedToolName(TASK_TOOL_NAME.to_string()));
            }
        }

        let builtins = builtin_tools(&state, self.local_filesystem);

        // Aggregate set: built-ins then caller tools, no task tool. This is
        // what sub-agents draw from, and what their subsets validate against.
        // Built here once to surface collisions and bad schemas at compose
        // time; sub-agent runs rebuild it bound to their forked state.
        let mut aggregate = ToolRegistry::new();
        for tool in builtins.iter().chain(self.tools.iter()) {
            aggregate.register(tool.clone())?;
        }

        let known: HashSet<String> = aggregate.names().into_iter().collect();
        self.validate_subagents(&known)?;

        let factory: ChildDispatcherFactory<S> = {
            let user_tools = self.tools.clone();
            let local = self.local_filesystem;
            let timeout = self.tool_timeout;
            Arc::new(move |child| {
                let mut registry = ToolRegistry::new();
                for tool in builtin_tools(&child, local)
                    .into_iter()
                    .chain(user_tools.iter().cloned())
                {
                    registry.register(tool)?;
                }
                let mut dispatcher = CompositeDispatcher::new(registry);
                if let Some(timeout) = timeout {
                    dispatcher = dispatcher.with_timeout(timeout);
                }
                Ok(Arc::new(dispatcher) as Arc<dyn ToolDispatch>)
            })
        };

        let task_tool = TaskTool::new(
            self.subagents,
            Arc::clone(&self.engine),
            model.clone(),
            factory,
            Arc::clone(&state),
            self.max_steps,
            self.post_step.clone(),
        );

        // Full set for the top-level run: aggregate plus the task tool, last.
        let mut full = ToolRegistry::new();
        for tool in builtins.into_iter().chain(self.tools) {
            full.register(tool)?;
        }
        full.register(Tool::from_handler(Arc::new(task_tool)))?;

        let mut dispatcher = CompositeDispatcher::new(full);
        if let Some(timeout) = self.tool_timeout {
            dispatcher = dispatcher.with_timeout(timeout);
        }

        let mut prompt = self.instructions;
        prompt.push_str(prompts::BASE_PROMPT_SUFFIX);

        tracing::debug!(model = %model, "composed deep agent");
        Ok(DeepAgent {
            prompt,
            model,
            dispatcher: Arc::new(dispatcher),
            state,
            engine: self.engine,
            checkpointer: self.checkpointer,
            post_step: self.post_step,
            max_steps: self.max_steps,
        })
    }
}

/// The built-in tool set bound to a state handle: planning first, then the
/// filesystem tools, with the consolidated editor only in local mode.
fn builtin_tools<S: DeepState>(state: &Shared<S>, local_filesystem: bool) -> Vec<Tool> {
    let backend: Arc<dyn FsBackend> = if local_filesystem {
        Arc::new(LocalFs::new())
    } else {
        Arc::new(StateFs::new(Arc::clone(state)))
    };

    let mut builtins = vec![
        Tool::from_handler(Arc::new(WriteTodosTool::new(Arc::clone(state)))),
        Tool::from_handler(Arc::new(LsTool::new(Arc::clone(&backend)))),
        Tool::from_handler(Arc::new(ReadFileTool::new(Arc::clone(&backend)))),
        Tool::from_handler(Arc::new(WriteFileTool::new(Arc::clone(&backend)))),
        Tool::from_handler(Arc::new(EditFileTool::new(Arc::clone(&backend)))),
        Tool::from_handler(Arc::new(GlobTool::new(Arc::clone(&backend)))),
        Tool::from_handler(Arc::new(GrepTool::new(backend))),
    ];
    if local_filesystem {
        builtins.push(Tool::from_handler(Arc::new(StrReplaceEditTool::new())));
    }
    builtins
}

/// A composed agent bound to its reasoning loop and validated tool set
pub struct DeepAgent<S: DeepState> {
    prompt: String,
    model: ModelHandle,
    dispatcher: Arc<dyn ToolDispatch>,
    state: Shared<S>,
    engine: Arc<dyn ReasoningLoop<S>>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    post_step: Option<PostStepHook>,
    max_steps: u32,
}

impl<S: DeepState> std::fmt::Debug for DeepAgent<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepAgent")
            .field("model", &self.model)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

impl<S: DeepState> DeepAgent<S> {
    /// Run one task to a terminal outcome.
    ///
    /// State persists across invokes on the same agent; with a checkpointer
    /// configured, the post-run state is saved before returning.
    pub async fn invoke(&self, input: impl Into<String>) -> Result<LoopOutcome, AgentError> {
        let request = LoopRequest {
            system_prompt: self.prompt.clone(),
            model: self.model.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            state: Arc::clone(&self.state),
            input: input.into(),
            max_steps: self.max_steps,
            post_step: self.post_step.clone(),
        };
        let outcome = self.engine.run(request).await?;

        if let Some(checkpointer) = &self.checkpointer {
            let state = self.state.read().await;
            checkpointer.save(&state).await?;
        }
        Ok(outcome)
    }

    /// Save the current state through the checkpointer on demand.
    ///
    /// Returns whether a save happened; invoke already saves automatically
    /// when a checkpointer is configured.
    pub async fn checkpoint(&self) -> Result<bool, AgentError> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(false);
        };
        let state = self.state.read().await;
        checkpointer.save(&state).await?;
        Ok(true)
    }

    /// Replace the session state with the checkpointer's latest snapshot.
    ///
    /// Returns whether a snapshot existed. Without a checkpointer this is a
    /// no-op returning false.
    pub async fn restore(&self) -> Result<bool, AgentError> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(false);
        };
        match checkpointer.load().await? {
            Some(loaded) => {
                *self.state.write().await = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handle to the live session state
    pub fn state(&self) -> Shared<S> {
        Arc::clone(&self.state)
    }

    /// The complete system prompt, instructions plus operational suffix
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The resolved model
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Names of every tool the top-level run advertises, in order
    pub fn tool_names(&self) -> Vec<String> {
        self.dispatcher
            .tools()
            .iter()
            .map(|def| def.name.clone())
            .collect()
    }
}
