//! Core tool system for agents
//!
//! This module provides a schema-driven tool system:
//! - Tool definitions described with JSON Schema
//! - A registry for discovery, lookup, and schema export to models
//! - A small context type passed to every tool invocation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole};

/// JSON Schema definition for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameterSchema {
    /// JSON Schema type (object, string, number, boolean, array, null);
    /// empty for untyped subschemas such as a bare `anyOf`
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub schema_type: String,

    /// Description of this parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Properties for object types (nested schemas)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, ToolParameterSchema>>,

    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ToolParameterSchema>>,

    /// Enum values for restricted choices
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Additional schema keywords (minimum, pattern, format, ...)
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl ToolParameterSchema {
    fn typed(schema_type: &str, description: Option<String>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            description,
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            default: None,
            additional: HashMap::new(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::typed("string", Some(description.into()))
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::typed("integer", Some(description.into()))
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::typed("boolean", Some(description.into()))
    }

    /// Create an object parameter with properties
    pub fn object(
        description: impl Into<String>,
        properties: HashMap<String, ToolParameterSchema>,
        required: Vec<String>,
    ) -> Self {
        Self {
            properties: Some(properties),
            required: Some(required),
            ..Self::typed("object", Some(description.into()))
        }
    }

    /// An object schema with no properties at all.
    pub fn empty_object() -> Self {
        Self {
            properties: Some(HashMap::new()),
            required: Some(Vec::new()),
            ..Self::typed("object", None)
        }
    }
}

/// Complete schema definition for a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// Unique, stable name the model uses to invoke this tool
    pub name: String,

    /// Human-readable description of what this tool does
    pub description: String,

    /// Input parameter schema (typically an object with properties)
    pub parameters: ToolParameterSchema,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Create a tool schema with no parameters
    pub fn no_params(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ToolParameterSchema::empty_object())
    }
}

/// Context provided to tool implementations
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Directory relative paths are resolved against
    pub working_dir: PathBuf,

    /// Call ID used to correlate the response with the model's request
    pub tool_call_id: Option<String>,
}

impl ToolContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            tool_call_id: None,
        }
    }

    /// Set the tool call ID for response correlation
    pub fn with_call_id(mut self, call_id: Option<String>) -> Self {
        self.tool_call_id = call_id;
        self
    }

    /// Resolve a tool-supplied path against the working directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    fn metadata(&self) -> Option<MessageMetadata> {
        self.tool_call_id.as_ref().map(|id| MessageMetadata {
            tool_call_id: Some(id.clone()),
            tool_calls: Vec::new(),
        })
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub message: AgentMessage,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a simple text result
    pub fn text(ctx: &ToolContext, content: impl Into<String>) -> Self {
        Self {
            message: AgentMessage {
                role: MessageRole::Tool,
                content: MessageContent::Text(content.into()),
                metadata: ctx.metadata(),
            },
            is_error: false,
        }
    }

    /// Create a JSON result
    pub fn json(ctx: &ToolContext, content: Value) -> Self {
        Self {
            message: AgentMessage {
                role: MessageRole::Tool,
                content: MessageContent::Json(content),
                metadata: ctx.metadata(),
            },
            is_error: false,
        }
    }

    /// An error reported back to the model, prefixed with `Error: `.
    pub fn error(ctx: &ToolContext, content: impl std::fmt::Display) -> Self {
        Self {
            is_error: true,
            ..Self::text(ctx, format!("Error: {content}"))
        }
    }
}

/// Core trait for tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the schema definition for this tool
    fn schema(&self) -> ToolSchema;

    /// Executes the tool with the given arguments and context
    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult>;

    /// Whether a human must approve each call before it runs.
    fn requires_approval(&self) -> bool {
        false
    }
}

/// Type alias for shared tool instances
pub type ToolBox = Arc<dyn Tool>;

/// Tool registry keyed by tool name, iterated in name order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolBox>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name
    pub fn register(&mut self, tool: ToolBox) -> &mut Self {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool_name = %name, "Replacing previously registered tool");
        }
        self
    }

    /// Register multiple tools
    pub fn register_all<I>(&mut self, tools: I) -> &mut Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        for tool in tools {
            self.register(tool);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolBox> {
        self.tools.get(name)
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::no_params(self.0, "Echo the arguments back")
        }

        async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::json(&ctx, args))
        }
    }

    #[test]
    fn registry_lists_names_in_order() {
        let mut registry = ToolRegistry::new();
        registry.register_all([
            Arc::new(EchoTool("zeta")) as ToolBox,
            Arc::new(EchoTool("alpha")) as ToolBox,
        ]);

        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert!(registry.has("zeta"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn schema_serializes_additional_keywords_inline() {
        let mut schema = ToolParameterSchema::integer("Line offset");
        schema
            .additional
            .insert("minimum".to_string(), serde_json::json!(0));

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "integer");
        assert_eq!(value["minimum"], 0);
        assert!(value.get("properties").is_none());
    }

    #[test]
    fn context_resolves_relative_paths() {
        let ctx = ToolContext::new("/work");
        assert_eq!(ctx.resolve_path("a/b.txt"), PathBuf::from("/work/a/b.txt"));
        assert_eq!(ctx.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[tokio::test]
    async fn error_results_are_prefixed_and_flagged() {
        let ctx = ToolContext::new("/work").with_call_id(Some("call_9".into()));
        let result = ToolResult::error(&ctx, "boom");
        assert!(result.is_error);
        assert_eq!(result.message.text(), "Error: boom");
        assert_eq!(result.message.tool_call_id(), Some("call_9"));

        let ok = EchoTool("echo")
            .execute(serde_json::json!({"a": 1}), ctx)
            .await
            .unwrap();
        assert!(!ok.is_error);
    }
}
