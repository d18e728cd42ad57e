//! Canonical tool record and source-shape normalization
//!
//! Tools reach the composer in three admissible shapes: an object carrying
//! its own definition and invocation capability ([`ToolHandler`]), a plain
//! async function paired with name/description/schema metadata, or a
//! declarative [`ToolDef`] with a separate handler function. All three are
//! normalized into one [`Tool`] record at registration; nothing branches on
//! the source shape at call time.

use async_trait::async_trait;
use fennec_core::{ToolDef, ToolError};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// An object-shaped tool: definition and invocation behavior in one place.
///
/// Built-in tools implement this trait; user tools may too.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Returns the tool definition for the model
    fn def(&self) -> ToolDef;

    /// Execute the tool with the given JSON arguments
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

type DynToolFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;

/// Function-shaped tool adapted to [`ToolHandler`]
struct FnTool {
    def: ToolDef,
    f: Box<DynToolFn>,
}

#[async_trait]
impl ToolHandler for FnTool {
    fn def(&self) -> ToolDef {
        self.def.clone()
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        (self.f)(args).await
    }
}

/// Normalized tool record.
///
/// The definition is resolved exactly once, at construction; dispatch only
/// ever touches the stored handler.
#[derive(Clone)]
pub struct Tool {
    def: Arc<ToolDef>,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    /// Normalize an object-shaped tool
    pub fn from_handler(handler: Arc<dyn ToolHandler>) -> Self {
        let def = Arc::new(handler.def());
        Self { def, handler }
    }

    /// Normalize a plain async function plus metadata
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let def = ToolDef {
            name: name.into(),
            description: description.into(),
            input_schema,
        };
        Self::from_def(def, f)
    }

    /// Normalize a declarative definition paired with a handler function
    pub fn from_def<F, Fut>(def: ToolDef, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler = FnTool {
            def: def.clone(),
            f: Box::new(move |args| Box::pin(f(args))),
        };
        Self {
            def: Arc::new(def),
            handler: Arc::new(handler),
        }
    }

    /// The resolved definition
    pub fn def(&self) -> &Arc<ToolDef> {
        &self.def
    }

    /// The tool's unique name
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Invoke the tool
    pub async fn call(&self, args: Value) -> Result<Value, ToolError> {
        self.handler.call(args).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.def.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::empty_object_schema;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn def(&self) -> ToolDef {
            ToolDef {
                name: "echo".to_string(),
                description: "Echo the arguments back".to_string(),
                input_schema: empty_object_schema(),
            }
        }

        async fn call(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn normalizes_object_shape() {
        let tool = Tool::from_handler(Arc::new(Echo));
        assert_eq!(tool.name(), "echo");
        let out = tool.call(json!({"x": 1})).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }

    #[tokio::test]
    async fn normalizes_fn_shape() {
        let tool = Tool::from_fn("double", "Double a number", empty_object_schema(), |args| {
            let n = args["n"].as_i64().unwrap_or(0);
            async move { Ok(json!(n * 2)) }
        });
        assert_eq!(tool.name(), "double");
        assert_eq!(tool.call(json!({"n": 21})).await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn normalizes_declarative_shape() {
        let def = ToolDef {
            name: "ping".to_string(),
            description: "Reply pong".to_string(),
            input_schema: empty_object_schema(),
        };
        let tool = Tool::from_def(def, |_args| async { Ok(json!("pong")) });
        assert_eq!(tool.def().description, "Reply pong");
        assert_eq!(tool.call(json!({})).await.unwrap(), json!("pong"));
    }
}
