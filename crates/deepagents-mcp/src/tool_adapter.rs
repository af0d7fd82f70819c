//! MCP Tool Adapter
//!
//! Wraps tools discovered on an MCP server so the agent can call them like
//! any built-in tool.

use crate::{McpClient, McpTool};
use async_trait::async_trait;
use deepagents_core::tools::{Tool, ToolBox, ToolContext, ToolParameterSchema, ToolResult, ToolSchema};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Adapts an MCP tool to the agent's [`Tool`] trait
///
/// Calls are forwarded to the owning server under the tool's original name;
/// the model sees the namespaced name.
pub struct McpToolAdapter {
    client: Arc<McpClient>,
    tool: McpTool,
    namespace: Option<String>,
}

impl McpToolAdapter {
    pub fn new(client: Arc<McpClient>, tool: McpTool) -> Self {
        Self {
            client,
            tool,
            namespace: None,
        }
    }

    /// Prefix the tool name with `<namespace>_`, typically the server name,
    /// so tools from different servers cannot collide.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn into_toolbox(self) -> ToolBox {
        Arc::new(self)
    }

    /// Name exposed to the model
    pub fn effective_name(&self) -> String {
        exposed_name(self.namespace.as_deref(), &self.tool.name)
    }

    fn description(&self) -> String {
        match self.tool.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => desc.to_string(),
            _ => format!(
                "Tool {} from {}",
                self.tool.name,
                self.namespace.as_deref().unwrap_or("MCP server")
            ),
        }
    }

    /// Convert an MCP input schema into the agent's parameter schema. The
    /// top level is always an object.
    fn convert_schema(mcp_schema: &Value) -> ToolParameterSchema {
        let mut schema = Self::convert_subschema(mcp_schema);
        if schema.schema_type.is_empty() {
            schema.schema_type = "object".to_string();
        }
        schema
    }

    fn convert_subschema(mcp_schema: &Value) -> ToolParameterSchema {
        let schema_type = match mcp_schema.get("type") {
            Some(Value::String(t)) => t.clone(),
            // `["string", "null"]` style unions: take the first concrete type.
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .unwrap_or("string")
                .to_string(),
            _ if mcp_schema.get("properties").is_some() => "object".to_string(),
            _ if mcp_schema.get("items").is_some() => "array".to_string(),
            // Untyped (`anyOf`, `oneOf`, `$ref`, ...): keep it that way.
            _ => String::new(),
        };

        let description = mcp_schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        let properties = mcp_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::convert_subschema(v)))
                    .collect::<HashMap<_, _>>()
            });

        let required = mcp_schema.get("required").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        });

        let items = mcp_schema
            .get("items")
            .map(|i| Box::new(Self::convert_subschema(i)));

        let enum_values = mcp_schema.get("enum").and_then(|e| e.as_array().cloned());

        let default = mcp_schema.get("default").cloned();

        let additional = mcp_schema
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(key, _)| {
                !matches!(
                    key.as_str(),
                    "type"
                        | "description"
                        | "properties"
                        | "required"
                        | "items"
                        | "enum"
                        | "default"
                        | "$schema"
                )
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        ToolParameterSchema {
            schema_type,
            description,
            properties,
            required,
            items,
            enum_values,
            default,
            additional,
        }
    }
}

/// Longest function name chat-completion providers accept
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// `<namespace>_<tool>` restricted to `[A-Za-z0-9_]`, the intersection of
/// what chat-completion providers accept for function names.
///
/// Names over [`MAX_TOOL_NAME_LEN`] are cut short and end in a hash of the
/// full name, so distinct long names stay distinct.
pub fn exposed_name(namespace: Option<&str>, tool: &str) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    };
    let name = match namespace {
        Some(ns) => format!("{}_{}", sanitize(ns), sanitize(tool)),
        None => sanitize(tool),
    };
    if name.len() <= MAX_TOOL_NAME_LEN {
        return name;
    }

    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    let suffix = format!("_{:08x}", hasher.finish() as u32);
    // Sanitized names are ASCII, so byte slicing is on char boundaries.
    format!("{}{}", &name[..MAX_TOOL_NAME_LEN - suffix.len()], suffix)
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn schema(&self) -> ToolSchema {
        let mut parameters = Self::convert_schema(&self.tool.input_schema);
        if parameters.schema_type == "object" && parameters.properties.is_none() {
            parameters.properties = Some(HashMap::new());
        }
        ToolSchema {
            name: self.effective_name(),
            description: self.description(),
            parameters,
        }
    }

    #[instrument(skip(self, args, ctx), fields(tool_name = %self.effective_name()))]
    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        debug!(
            tool = %self.tool.name,
            namespace = ?self.namespace,
            "Executing MCP tool via adapter"
        );

        let mcp_result = self.client.call_tool(&self.tool.name, args).await?;
        let content = mcp_result.to_text();

        if mcp_result.is_error {
            Ok(ToolResult::error(&ctx, content))
        } else {
            Ok(ToolResult::text(&ctx, content))
        }
    }

    fn requires_approval(&self) -> bool {
        true
    }
}

/// Create tools for everything an MCP client discovered
///
/// ```rust,ignore
/// let client = Arc::new(McpClient::connect(transport).await?);
/// let tools = create_mcp_tools(client, Some("fs"));
/// // Tools are named "fs_read_file", "fs_write_file", ...
/// ```
pub fn create_mcp_tools(client: Arc<McpClient>, namespace: Option<&str>) -> Vec<ToolBox> {
    client
        .tools()
        .iter()
        .cloned()
        .map(|tool| {
            let mut adapter = McpToolAdapter::new(client.clone(), tool);
            if let Some(ns) = namespace {
                adapter = adapter.with_namespace(ns);
            }
            adapter.into_toolbox()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::MockTransport;

    async fn connected_client(responses: Vec<&str>) -> (Arc<McpClient>, MockTransport) {
        let mut script = vec![
            r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"mock"}}}"#,
            r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"read-text-file","inputSchema":{"type":"object","properties":{"path":{"type":"string"}},"required":["path"]}},{"name":"ping","description":"  "}]}}"#,
        ];
        script.extend(responses);
        let transport = MockTransport::new(script);
        let probe = transport.clone();
        (Arc::new(McpClient::connect(transport).await.unwrap()), probe)
    }

    #[test]
    fn test_schema_conversion() {
        let mcp_schema = serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "The file path to read"},
                "encoding": {"type": "string", "default": "utf-8"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "head": {"type": ["integer", "null"], "minimum": 1}
            },
            "required": ["path"],
            "additionalProperties": false
        });

        let schema = McpToolAdapter::convert_schema(&mcp_schema);

        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required.as_deref(), Some(&["path".to_string()][..]));
        assert_eq!(
            schema.additional.get("additionalProperties"),
            Some(&serde_json::json!(false))
        );
        assert!(!schema.additional.contains_key("$schema"));

        let props = schema.properties.unwrap();
        assert_eq!(props["path"].description.as_deref(), Some("The file path to read"));
        assert_eq!(props["encoding"].default, Some(serde_json::json!("utf-8")));
        assert_eq!(props["tags"].items.as_ref().unwrap().schema_type, "string");
        assert_eq!(props["head"].schema_type, "integer");
        assert_eq!(props["head"].additional["minimum"], 1);
    }

    #[test]
    fn test_schema_conversion_empty() {
        let schema = McpToolAdapter::convert_schema(&serde_json::json!({}));
        assert_eq!(schema.schema_type, "object");
        assert!(schema.properties.is_none());
    }

    #[test]
    fn test_untyped_subschemas_stay_untyped() {
        let mcp_schema = serde_json::json!({
            "properties": {
                "target": {"anyOf": [{"type": "string"}, {"type": "integer"}]},
                "filter": {"properties": {"kind": {"type": "string"}}},
                "ids": {"items": {"type": "integer"}}
            }
        });

        let schema = McpToolAdapter::convert_schema(&mcp_schema);
        assert_eq!(schema.schema_type, "object");

        let props = schema.properties.as_ref().unwrap();
        assert_eq!(props["filter"].schema_type, "object");
        assert_eq!(props["ids"].schema_type, "array");

        let wire = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            wire["properties"]["target"],
            serde_json::json!({"anyOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn test_long_names_are_capped() {
        let tool = "x".repeat(80);
        let name = exposed_name(Some("search"), &tool);
        assert_eq!(name.len(), MAX_TOOL_NAME_LEN);
        assert!(name.starts_with("search_xxx"));
        assert_eq!(name, exposed_name(Some("search"), &tool));

        let other = exposed_name(Some("search"), &format!("{tool}y"));
        assert_eq!(other.len(), MAX_TOOL_NAME_LEN);
        assert_ne!(name, other);

        let exact = "a".repeat(MAX_TOOL_NAME_LEN);
        assert_eq!(exposed_name(None, &exact), exact);
    }

    #[test]
    fn test_exposed_names() {
        assert_eq!(exposed_name(None, "read_file"), "read_file");
        assert_eq!(exposed_name(Some("fs"), "read_file"), "fs_read_file");
        assert_eq!(
            exposed_name(Some("docs"), "resolve-library-id"),
            "docs_resolve_library_id"
        );
        assert_eq!(
            exposed_name(Some("brave.search"), "web search"),
            "brave_search_web_search"
        );
    }

    #[tokio::test]
    async fn test_adapters_are_namespaced_and_gated() {
        let (client, _) = connected_client(vec![]).await;
        let tools = create_mcp_tools(client, Some("filesystem"));

        let schemas: Vec<_> = tools.iter().map(|t| t.schema()).collect();
        assert_eq!(schemas[0].name, "filesystem_read_text_file");
        assert_eq!(schemas[0].description, "Tool read-text-file from filesystem");
        assert_eq!(schemas[1].name, "filesystem_ping");
        assert_eq!(schemas[1].parameters.properties, Some(HashMap::new()));
        assert!(tools.iter().all(|t| t.requires_approval()));
    }

    #[tokio::test]
    async fn test_execute_forwards_original_name() {
        let (client, probe) = connected_client(vec![
            r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"line one"},{"type":"text","text":"line two"}]}}"#,
            r#"{"jsonrpc":"2.0","id":4,"result":{"content":[{"type":"text","text":"ENOENT"}],"isError":true}}"#,
        ])
        .await;

        let adapter = McpToolAdapter::new(client.clone(), client.tools()[0].clone())
            .with_namespace("fs");
        let ctx = ToolContext::new("/tmp").with_call_id(Some("call_1".into()));

        let ok = adapter
            .execute(serde_json::json!({"path": "/tmp/a"}), ctx.clone())
            .await
            .unwrap();
        assert!(!ok.is_error);
        assert_eq!(ok.message.text(), "line one\nline two");
        assert_eq!(ok.message.tool_call_id(), Some("call_1"));
        assert!(probe.sent()[3].contains(r#""name":"read-text-file""#));

        let failed = adapter
            .execute(serde_json::json!({"path": "/missing"}), ctx)
            .await
            .unwrap();
        assert!(failed.is_error);
        assert_eq!(failed.message.text(), "Error: ENOENT");
    }
}
