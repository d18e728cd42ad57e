//! Tool registry: unique-name enforcement and argument validation
//!
//! Registration preserves aggregation order (built-ins, then caller tools,
//! then the delegation tool) because the definitions surface to the model in
//! that order. Name collisions are construction-time errors, never runtime
//! shadowing.

use crate::error::ComposeError;
use crate::tool::Tool;
use fennec_core::{ToolDef, ToolError};
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of normalized tools with compiled schema validators
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
    validators: HashMap<String, Validator>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    /// Build a registry from tools in order, failing on any collision
    pub fn from_tools(tools: impl IntoIterator<Item = Tool>) -> Result<Self, ComposeError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool.
    ///
    /// Fails when the name is already taken or the input schema does not
    /// compile as JSON Schema.
    pub fn register(&mut self, tool: Tool) -> Result<(), ComposeError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ComposeError::DuplicateToolName(name));
        }

        let validator = Validator::new(&tool.def().input_schema).map_err(|e| {
            ComposeError::InvalidToolSchema {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        self.validators.insert(name.clone(), validator);

        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool definitions in registration order
    pub fn defs(&self) -> Vec<Arc<ToolDef>> {
        self.tools.iter().map(|t| t.def().clone()).collect()
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments against a tool's compiled schema
    pub fn validate(&self, name: &str, args: &Value) -> Result<(), ToolError> {
        if !self.index.contains_key(name) {
            return Err(ToolError::not_found(name));
        }

        if let Some(validator) = self.validators.get(name) {
            // is_valid is the fast path; errors are only collected on failure
            if !validator.is_valid(args) {
                let errors: Vec<String> = validator
                    .iter_errors(args)
                    .map(|e| format!("{}: {}", e.instance_path, e))
                    .collect();
                return Err(ToolError::invalid_arguments(name, errors.join("; ")));
            }
        }

        Ok(())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use serde_json::json;

    fn tool(name: &str) -> Tool {
        Tool::from_fn(
            name,
            "test tool",
            SchemaBuilder::new()
                .string("name", "a name")
                .integer("count", "a count")
                .required("name")
                .build(),
            |_args| async { Ok(json!("ok")) },
        )
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("read_file")).unwrap();
        let err = registry.register(tool("read_file")).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateToolName(name) if name == "read_file"));
    }

    #[test]
    fn preserves_registration_order() {
        let registry =
            ToolRegistry::from_tools([tool("write_todos"), tool("ls"), tool("task")]).unwrap();
        assert_eq!(registry.names(), ["write_todos", "ls", "task"]);
    }

    #[test]
    fn validates_against_schema() {
        let registry = ToolRegistry::from_tools([tool("t")]).unwrap();

        assert!(registry.validate("t", &json!({"name": "x", "count": 3})).is_ok());

        let err = registry.validate("t", &json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = registry.validate("t", &json!({"name": "x", "count": "three"}));
        assert!(err.is_err());

        let err = registry.validate("missing", &json!({})).unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
