//! Shared JSON schema helpers for tool parameter contracts.

use serde_json::{json, Map, Value};

/// Builder for object schemas with typed property helpers
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property with an explicit schema
    pub fn property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Add a string property
    pub fn string(self, name: impl Into<String>, description: &str) -> Self {
        self.property(name, json!({"type": "string", "description": description}))
    }

    /// Add an integer property
    pub fn integer(self, name: impl Into<String>, description: &str) -> Self {
        self.property(name, json!({"type": "integer", "description": description}))
    }

    /// Add a boolean property
    pub fn boolean(self, name: impl Into<String>, description: &str) -> Self {
        self.property(name, json!({"type": "boolean", "description": description}))
    }

    /// Mark a property as required
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Schema for tools taking no arguments
pub fn empty_object_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_object_schema() {
        let schema = SchemaBuilder::new()
            .string("file_path", "Path to read")
            .integer("offset", "Line offset")
            .required("file_path")
            .build();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["file_path"]["type"], "string");
        assert_eq!(schema["properties"]["offset"]["type"], "integer");
        assert_eq!(schema["required"], json!(["file_path"]));
    }
}
