//! Operation Dispatch Table
//!
//! Maps an externally visible tool name to its parameter schema and handler.
//! The table is built once per start and shared read-only with the request
//! server's workers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use core_runtime::error::{ToolError, ToolResult};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::params::Params;

/// Handler invoked with validated, normalized arguments.
pub type ToolHandler = Arc<dyn Fn(&Params) -> ToolResult<Value> + Send + Sync>;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<ParamKind>),
}

impl ParamKind {
    fn schema(&self) -> Value {
        match self {
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Number => json!({ "type": "number" }),
            ParamKind::Integer => json!({ "type": "integer" }),
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Array(item) => json!({ "type": "array", "items": item.schema() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    fn new(name: &'static str, description: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            description,
            kind,
            required: true,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, ParamKind::String)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, ParamKind::Number)
    }

    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, ParamKind::Integer)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, description, ParamKind::Boolean)
    }

    pub fn array(name: &'static str, description: &'static str, item: ParamKind) -> Self {
        Self::new(name, description, ParamKind::Array(Box::new(item)))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn schema(&self) -> Value {
        let mut schema = self.kind.schema();
        if let Value::Object(map) = &mut schema {
            map.insert("description".to_string(), json!(self.description));
        }
        schema
    }
}

/// Name, description and parameters of one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// JSON schema of the argument object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(param.name.to_string(), param.schema());
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Entry for a `tools/list` response.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

struct Entry {
    spec: ToolSpec,
    handler: ToolHandler,
}

#[derive(Default)]
pub struct DispatchTable {
    tools: BTreeMap<&'static str, Entry>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration under the same name replaces
    /// the earlier one.
    pub fn register<F>(&mut self, spec: ToolSpec, handler: F)
    where
        F: Fn(&Params) -> ToolResult<Value> + Send + Sync + 'static,
    {
        let name = spec.name;
        self.tools.insert(
            name,
            Entry {
                spec,
                handler: Arc::new(handler),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Specs in name order.
    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values().map(|entry| &entry.spec)
    }

    /// Normalize `arguments` and invoke the named tool.
    pub fn call(&self, name: &str, arguments: Value) -> ToolResult<Value> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::invalid_params(format!("Unknown tool: {}", name)))?;

        let params = Params::from_value(arguments)?;
        debug!(tool = name, "Dispatching tool call");
        (entry.handler)(&params)
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Wrap a payload as MCP text content.
pub fn text_content(payload: &Value) -> Value {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    json!([{ "type": "text", "text": text }])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_table() -> DispatchTable {
        let mut table = DispatchTable::new();
        table.register(
            ToolSpec::new("echo", "Echo a message.")
                .param(ParamSpec::string("message", "Text to echo."))
                .param(ParamSpec::array("tags", "Tags.", ParamKind::String).optional()),
            |params| Ok(json!({ "message": params.require_string("message")? })),
        );
        table
    }

    #[test]
    fn test_call_routes_to_handler() {
        let table = echo_table();
        let result = table.call("echo", json!({ "message": "hi" })).unwrap();
        assert_eq!(result, json!({ "message": "hi" }));
    }

    #[test]
    fn test_unknown_tool_is_invalid_params() {
        let table = echo_table();
        let err = table.call("nope", Value::Null).unwrap_err();
        assert!(err.is_invalid_params());
        assert_eq!(err.message, "Unknown tool: nope");
    }

    #[test]
    fn test_non_object_arguments_rejected_before_handler() {
        let table = echo_table();
        let err = table.call("echo", json!("hi")).unwrap_err();
        assert_eq!(err.message, "Tool arguments must be a JSON object.");
    }

    #[test]
    fn test_input_schema() {
        let table = echo_table();
        let spec = table.specs().next().unwrap();
        let schema = spec.input_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["message"]["type"], "string");
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(schema["required"], json!(["message"]));
        assert_eq!(spec.describe()["name"], "echo");
    }

    #[test]
    fn test_text_content_is_pretty_json() {
        let content = text_content(&json!({ "object_id": 1 }));
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "{\n  \"object_id\": 1\n}");
    }
}
