//! Checkpoint surface for session state
//!
//! Storage mechanics are external; this trait only fixes the save/load
//! contract a deep agent calls through when a checkpointer is configured.

use crate::error::AgentError;
use async_trait::async_trait;

/// Persists and restores session state between runs
#[async_trait]
pub trait Checkpointer<S>: Send + Sync {
    /// Persist the current state
    async fn save(&self, state: &S) -> Result<(), AgentError>;

    /// Load the most recent state, if any was persisted
    async fn load(&self) -> Result<Option<S>, AgentError>;
}
