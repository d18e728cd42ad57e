//! The `write_todos` planning tool
//!
//! Every call replaces the whole plan. There is no partial-update form:
//! callers always submit the complete list they want to be true afterwards.

use crate::prompts;
use crate::schema::SchemaBuilder;
use crate::tool::ToolHandler;
use async_trait::async_trait;
use fennec_core::{DeepState, Shared, Todo, ToolDef, ToolError};
use serde_json::{json, Value};

pub const WRITE_TODOS_TOOL_NAME: &str = "write_todos";

/// Replaces the session's todo list wholesale
pub struct WriteTodosTool<S: DeepState> {
    state: Shared<S>,
}

impl<S: DeepState> WriteTodosTool<S> {
    pub fn new(state: Shared<S>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl<S: DeepState> ToolHandler for WriteTodosTool<S> {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: WRITE_TODOS_TOOL_NAME.to_string(),
            description: prompts::WRITE_TODOS_DESCRIPTION.to_string(),
            input_schema: SchemaBuilder::new()
                .property(
                    "todos",
                    json!({
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "content": {
                                    "type": "string",
                                    "description": "What this item tracks"
                                },
                                "status": {
                                    "type": "string",
                                    "enum": ["pending", "in_progress", "completed"],
                                    "description": "Current state of the item"
                                }
                            },
                            "required": ["content", "status"]
                        },
                        "description": "The complete new todo list"
                    }),
                )
                .required("todos")
                .build(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let todos_value = args
            .get("todos")
            .cloned()
            .ok_or_else(|| ToolError::invalid_arguments(WRITE_TODOS_TOOL_NAME, "missing 'todos'"))?;
        // Todo's strict status deserializer rejects unknown status strings here.
        let todos: Vec<Todo> = serde_json::from_value(todos_value)
            .map_err(|e| ToolError::invalid_arguments(WRITE_TODOS_TOOL_NAME, e.to_string()))?;

        let count = todos.len();
        let mut state = self.state.write().await;
        state.set_todos(todos);
        tracing::debug!(count, "todo list replaced");

        Ok(Value::String(format!(
            "Updated todo list to {count} item(s)"
        )))
    }
}
