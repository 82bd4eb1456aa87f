//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are named, optionally schema-described async functions the model
//! can ask the agent to run. The runtime treats `execute` as untrusted code:
//! its errors become observations for the model, never run aborts.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Reserved action name the model uses to end a run.
///
/// It is a protocol signal, not a tool: it is described in the tool
/// catalog but can never be registered or executed.
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// A tool definition presented to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    /// The catalog entry for the `final_answer` protocol signal.
    pub fn final_answer() -> Self {
        Self {
            name: FINAL_ANSWER_TOOL.into(),
            description: "Provides a final response to the user and terminates the interaction. \
                          Use this when you have gathered enough information to answer the user's request."
                .into(),
            parameters: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "response": {
                        "type": "string",
                        "description": "The final response to provide to the user"
                    }
                },
                "required": ["response"]
            })),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    ///
    /// Tools without a schema accept any input.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    /// Execute the tool with already-validated input.
    async fn execute(&self, input: Value) -> std::result::Result<Value, ToolError>;

    /// Convert this tool into a ToolDefinition for the catalog.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Read-mostly: register everything before runs start, then share it
/// behind an `Arc`. Lookups are safe from any number of concurrent runs.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// Fails if the name is taken or is the reserved `final_answer` signal.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if name == FINAL_ANSWER_TOOL {
            return Err(ToolError::ReservedName(name));
        }
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }
        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Remove a tool. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tools, sorted by name.
    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `input` against the named tool's declared schema.
    pub fn validate_arguments(
        &self,
        name: &str,
        input: &Value,
    ) -> std::result::Result<(), ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        match tool.parameters_schema() {
            Some(schema) => {
                validate_against_schema(&schema, input).map_err(|reason| ToolError::invalid(name, reason))
            }
            None => Ok(()),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a value against the subset of JSON Schema tools declare:
/// top-level `type`, `required`, and per-property `type` / `enum`.
pub fn validate_against_schema(schema: &Value, input: &Value) -> std::result::Result<(), String> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str)
        && !type_matches(expected, input)
    {
        return Err(format!(
            "expected {expected}, got {}",
            json_type_name(input)
        ));
    }

    let Some(object) = input.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(field) {
                return Err(format!("missing required field '{field}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in object {
            let Some(property) = properties.get(key) else {
                continue;
            };
            if let Some(expected) = property.get("type").and_then(Value::as_str)
                && !type_matches(expected, value)
            {
                return Err(format!(
                    "field '{key}' expected {expected}, got {}",
                    json_type_name(value)
                ));
            }
            if let Some(allowed) = property.get("enum").and_then(Value::as_array)
                && !allowed.contains(value)
            {
                return Err(format!("field '{key}' must be one of {}", Value::Array(allowed.clone())));
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        // Unknown type keywords are not enforced.
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
