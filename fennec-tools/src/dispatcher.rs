//! Tool dispatch with timeouts and allow-list filtering

use crate::registry::ToolRegistry;
use async_trait::async_trait;
use fennec_core::{ToolCall, ToolDef, ToolDispatch, ToolError, ToolResult};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Dispatcher over a registry of normalized tools.
///
/// Validates arguments against the registered schema, then invokes the
/// tool's handler, under a timeout when one is configured. All failures
/// come back as [`ToolError`] so the loop can fold them into tool results.
/// No default timeout: delegations through the `task` tool legitimately
/// run for a long time, bounded by the loop's step ceiling instead.
pub struct CompositeDispatcher {
    registry: ToolRegistry,
    timeout: Option<Duration>,
}

impl CompositeDispatcher {
    /// Create a new dispatcher over the given registry
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Dispatch a single call, folding any failure into the result
    pub async fn dispatch_one(&self, call: &ToolCall) -> ToolResult {
        fennec_core::fold_dispatch_result(call, self.dispatch(&call.name, &call.args).await)
    }

    /// Dispatch multiple tool calls in parallel
    pub async fn dispatch_parallel(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let futures = calls.iter().map(|call| self.dispatch_one(call));
        futures::future::join_all(futures).await
    }
}

#[async_trait]
impl ToolDispatch for CompositeDispatcher {
    fn tools(&self) -> Vec<Arc<ToolDef>> {
        self.registry.defs()
    }

    async fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::not_found(name))?;

        self.registry.validate(name, args)?;

        tracing::debug!(tool = name, "dispatching tool call");
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, tool.call(args.clone()))
                .await
                .map_err(|_| ToolError::timeout(name, timeout.as_millis() as u64))?,
            None => tool.call(args.clone()).await,
        };

        if let Err(ref err) = result {
            tracing::warn!(tool = name, error = %err, "tool call failed");
        }
        result
    }
}

/// A dispatcher exposing only an allow-listed subset of another dispatcher.
///
/// Sub-agents with a restricted tool subset see the parent's aggregate set
/// through this filter; everything outside the subset behaves as if it did
/// not exist.
pub struct FilteredDispatcher {
    inner: Arc<dyn ToolDispatch>,
    allowed: HashSet<String>,
}

impl FilteredDispatcher {
    /// Restrict `inner` to the given tool names
    pub fn allow(inner: Arc<dyn ToolDispatch>, names: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner,
            allowed: names.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ToolDispatch for FilteredDispatcher {
    fn tools(&self) -> Vec<Arc<ToolDef>> {
        self.inner
            .tools()
            .into_iter()
            .filter(|def| self.allowed.contains(&def.name))
            .collect()
    }

    async fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        if !self.allowed.contains(name) {
            return Err(ToolError::not_found(name));
        }
        self.inner.dispatch(name, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::empty_object_schema;
    use crate::tool::Tool;
    use serde_json::json;

    fn dispatcher() -> CompositeDispatcher {
        let registry = ToolRegistry::from_tools([
            Tool::from_fn("fast", "returns quickly", empty_object_schema(), |_| async {
                Ok(json!("done"))
            }),
            Tool::from_fn("slow", "sleeps forever", empty_object_schema(), |_| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!("never"))
            }),
        ])
        .unwrap();
        CompositeDispatcher::new(registry)
    }

    #[tokio::test]
    async fn dispatches_registered_tool() {
        let d = dispatcher();
        assert_eq!(d.dispatch("fast", &json!({})).await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let d = dispatcher();
        let err = d.dispatch("missing", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_slow_tools() {
        let d = dispatcher().with_timeout(Duration::from_millis(50));
        let err = d.dispatch("slow", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn dispatch_parallel_folds_results() {
        let d = dispatcher();
        let calls = vec![
            ToolCall::new("c1", "fast", json!({})),
            ToolCall::new("c2", "missing", json!({})),
        ];
        let results = d.dispatch_parallel(&calls).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].is_error);
        assert!(results[1].is_error);
        assert_eq!(results[1].call_id, "c2");
    }

    #[tokio::test]
    async fn filtered_dispatcher_hides_tools() {
        let inner: Arc<dyn ToolDispatch> = Arc::new(dispatcher());
        let filtered = FilteredDispatcher::allow(inner, ["fast".to_string()]);

        let names: Vec<String> = filtered.tools().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, ["fast"]);

        let err = filtered.dispatch("slow", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
