//! MCP Protocol Types
//!
//! The MCP-specific payloads exchanged after the JSON-RPC envelope:
//! - Initialization handshake and capabilities
//! - Tool definitions, listing, and calls
//! - Content returned from tool calls

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol revision this client speaks
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name advertised in `clientInfo`
pub const CLIENT_NAME: &str = "deepagents-cli";

// ============================================
// Initialization Types
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    pub capabilities: ClientCapabilities,

    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// Client capabilities advertised during initialization
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: CLIENT_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Result of the initialize request
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    #[serde(default)]
    pub capabilities: ServerCapabilities,

    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,

    #[serde(default)]
    pub instructions: Option<String>,
}

/// Server capabilities advertised during initialization
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<ToolsCapability>,

    #[serde(default)]
    pub resources: Option<Value>,

    #[serde(default)]
    pub prompts: Option<Value>,

    #[serde(default)]
    pub logging: Option<Value>,

    #[serde(default)]
    pub experimental: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,
}

// ============================================
// Tool Types
// ============================================

/// Tool definition as reported by `tools/list`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct McpTool {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// JSON Schema for the tool's input
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object"})
}

/// Parameters for `tools/list`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolsListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Result of listing tools
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<McpTool>,

    /// Cursor for the next page, if any
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// Parameters for `tools/call`
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Value,
}

/// Result of calling a tool
#[derive(Debug, Clone, Deserialize)]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,

    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl McpToolResult {
    /// Flatten the content into text: text blocks verbatim, embedded
    /// resources by their text, images and unknown blocks as placeholders.
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(McpContent::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================
// Content Types
// ============================================

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpContent {
    Text {
        text: String,
    },

    /// Base64 image data
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    Resource {
        resource: EmbeddedResource,
    },

    /// Any content type this client does not model (audio, resource links, ...)
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl McpContent {
    pub fn text(content: impl Into<String>) -> Self {
        McpContent::Text {
            text: content.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            McpContent::Text { text } => Some(text),
            McpContent::Resource { resource } => resource.text.as_deref(),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            McpContent::Text { text } => text.clone(),
            McpContent::Image { data, mime_type } => {
                format!("[Image: {} ({} bytes)]", mime_type, data.len())
            }
            McpContent::Resource { resource } => resource
                .text
                .clone()
                .unwrap_or_else(|| format!("[Resource: {}]", resource.uri)),
            McpContent::Unknown => "[Unsupported content]".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_deserialization() {
        let json = r#"{
            "name": "read_file",
            "description": "Read contents of a file",
            "inputSchema": {
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }
        }"#;

        let tool: McpTool = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "read_file");
        assert_eq!(tool.description.as_deref(), Some("Read contents of a file"));
        assert_eq!(tool.input_schema["required"][0], "path");
    }

    #[test]
    fn test_tool_without_schema_defaults_to_object() {
        let tool: McpTool = serde_json::from_str(r#"{"name":"ping"}"#).unwrap();
        assert_eq!(tool.input_schema, serde_json::json!({"type": "object"}));
    }

    #[test]
    fn test_tool_result_flattens_mixed_content() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///a.txt", "text": "inline"}},
                {"type": "audio", "data": "xyz", "mimeType": "audio/wav"}
            ],
            "isError": false
        }"#;

        let result: McpToolResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.to_text(),
            "first\n[Image: image/png (4 bytes)]\ninline\n[Unsupported content]"
        );
    }

    #[test]
    fn test_initialize_params_serialization() {
        let json = serde_json::to_value(InitializeParams::default()).unwrap();
        assert_eq!(json["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(json["clientInfo"]["name"], CLIENT_NAME);
        assert_eq!(json["capabilities"], serde_json::json!({}));
    }

    #[test]
    fn test_content_helper() {
        let content = McpContent::text("test content");
        assert_eq!(content.as_text(), Some("test content"));
    }
}
