//! Session state shared between a deep agent and its sub-agents
//!
//! State splits into two layers: a private per-loop transcript (`messages`,
//! never merged across the delegation boundary) and a shared, mergeable
//! field set (`todos`, `files`). [`DeepState::fork`] snapshots the shared
//! fields for a sub-agent; [`DeepState::absorb`] folds its mutations back
//! with last-writer-wins semantics, applied exactly once at dispatch return.

use crate::types::{Message, Todo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Virtual file table: path-like string keys mapped to content.
///
/// Keys carry no filesystem semantics in virtual mode; there is no directory
/// tree, just string keys.
pub type FileMap = BTreeMap<String, String>;

/// Shared handle to a session's state.
///
/// One logical resource per session. Sub-agent merges take the write lock,
/// so concurrent sibling dispatches serialize their merges.
pub type Shared<S> = Arc<RwLock<S>>;

/// Wrap a state value into a shared handle
pub fn shared<S: DeepState>(state: S) -> Shared<S> {
    Arc::new(RwLock::new(state))
}

/// Contract every deep-agent state type must satisfy.
///
/// Extensions of the base [`AgentState`] must retain the transcript, plan,
/// and file-table fields so the built-in tools keep functioning unchanged;
/// this trait is how that requirement is enforced at the type level. The
/// same state type flows into every nested dispatch.
pub trait DeepState: Default + Send + Sync + 'static {
    /// Conversation transcript (session-scoped, never merged)
    fn messages(&self) -> &[Message];

    /// Append a turn to the transcript
    fn push_message(&mut self, message: Message);

    /// Current plan
    fn todos(&self) -> &[Todo];

    /// Replace the plan wholesale. No partial update exists.
    fn set_todos(&mut self, todos: Vec<Todo>);

    /// Virtual file table
    fn files(&self) -> &FileMap;

    /// Mutable virtual file table
    fn files_mut(&mut self) -> &mut FileMap;

    /// Snapshot for a sub-agent: shared fields copied, transcript empty.
    ///
    /// Extension fields fall back to their `Default` values; only the shared
    /// fields cross the delegation boundary.
    fn fork(&self) -> Self {
        let mut child = Self::default();
        child.set_todos(self.todos().to_vec());
        child.files_mut().clone_from(self.files());
        child
    }

    /// Fold a finished sub-agent's shared fields back in.
    ///
    /// The plan is replaced with the child's final list (most recent full
    /// list wins); file entries are upserted per key (last writer wins).
    /// The child's transcript is discarded.
    fn absorb(&mut self, child: &Self) {
        self.set_todos(child.todos().to_vec());
        for (path, content) in child.files() {
            self.files_mut().insert(path.clone(), content.clone());
        }
    }
}

/// Base state for a deep agent session.
///
/// Custom state types embed these fields (or delegate to an embedded
/// `AgentState`) and implement [`DeepState`] over them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentState {
    /// Ordered transcript of this session
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Ordered plan, replaced wholesale by the planning tool
    #[serde(default)]
    pub todos: Vec<Todo>,
    /// Virtual file table (unused when the agent runs on the local filesystem)
    #[serde(default)]
    pub files: FileMap,
}

impl DeepState for AgentState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn todos(&self) -> &[Todo] {
        &self.todos
    }

    fn set_todos(&mut self, todos: Vec<Todo>) {
        self.todos = todos;
    }

    fn files(&self) -> &FileMap {
        &self.files
    }

    fn files_mut(&mut self) -> &mut FileMap {
        &mut self.files
    }
}
