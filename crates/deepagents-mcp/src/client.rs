//! MCP Client Implementation
//!
//! The MCP client handles the protocol-level communication with MCP servers,
//! including initialization, tool listing, and tool execution.

use crate::protocol::{
    messages::{
        error_codes, IncomingMessage, JsonRpcNotification, JsonRpcReply, JsonRpcRequest,
        JsonRpcResponse, RequestId, ServerRequest,
    },
    types::{
        InitializeParams, InitializeResult, McpTool, McpToolResult, ToolCallParams,
        ToolsListParams, ToolsListResult,
    },
    McpError,
};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace, warn};

/// Default timeout for MCP requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on `tools/list` pages, guarding against cursor loops
const MAX_TOOL_PAGES: usize = 64;

/// MCP Client Configuration
#[derive(Debug, Clone)]
pub struct McpClientConfig {
    /// Timeout for individual requests
    pub request_timeout: Duration,

    /// Whether to list tools right after initialization
    pub auto_list_tools: bool,

    /// Overrides the `clientInfo.name` sent during initialization
    pub client_name: Option<String>,

    /// Overrides the `clientInfo.version` sent during initialization
    pub client_version: Option<String>,
}

impl Default for McpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            auto_list_tools: true,
            client_name: None,
            client_version: None,
        }
    }
}

/// MCP Client
///
/// One client per server. Requests are serialized over the transport so
/// responses can never be paired with the wrong request.
pub struct McpClient {
    transport: Mutex<Box<dyn Transport>>,
    request_id: AtomicU64,
    config: McpClientConfig,
    server_info: Option<InitializeResult>,
    tools: Vec<McpTool>,
    initialized: AtomicBool,
}

impl McpClient {
    /// Connect to an MCP server and perform initialization
    ///
    /// ```rust,ignore
    /// let transport = StdioTransport::spawn("npx", &["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]).await?;
    /// let client = McpClient::connect(transport).await?;
    /// ```
    pub async fn connect<T: Transport + 'static>(transport: T) -> Result<Self, McpError> {
        Self::connect_with_config(transport, McpClientConfig::default()).await
    }

    #[instrument(skip(transport, config), name = "mcp_connect")]
    pub async fn connect_with_config<T: Transport + 'static>(
        transport: T,
        config: McpClientConfig,
    ) -> Result<Self, McpError> {
        let mut client = Self::with_transport(Box::new(transport), config);

        client.initialize().await?;

        if client.config.auto_list_tools && client.supports_tools() {
            client.tools = client.list_tools_internal().await?;
            info!(tool_count = client.tools.len(), "Discovered MCP tools");
        }

        Ok(client)
    }

    fn with_transport(transport: Box<dyn Transport>, config: McpClientConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            request_id: AtomicU64::new(1),
            config,
            server_info: None,
            tools: Vec::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Perform the MCP initialization handshake
    async fn initialize(&mut self) -> Result<(), McpError> {
        debug!("Starting MCP initialization handshake");

        let mut params = InitializeParams::default();
        if let Some(ref name) = self.config.client_name {
            params.client_info.name = name.clone();
        }
        if let Some(ref version) = self.config.client_version {
            params.client_info.version = version.clone();
        }

        let result: InitializeResult = self.send_request("initialize", Some(params)).await?;

        info!(
            server_name = %result.server_info.name,
            server_version = ?result.server_info.version,
            protocol_version = %result.protocol_version,
            "MCP server initialized"
        );

        self.server_info = Some(result);

        self.send_notification("notifications/initialized", None::<()>)
            .await?;

        self.initialized.store(true, Ordering::SeqCst);
        debug!("MCP initialization complete");

        Ok(())
    }

    /// Servers that omit capabilities entirely are still asked for tools.
    fn supports_tools(&self) -> bool {
        match &self.server_info {
            Some(info) => {
                let caps = &info.capabilities;
                caps.tools.is_some()
                    || (caps.resources.is_none() && caps.prompts.is_none() && caps.logging.is_none())
            }
            None => false,
        }
    }

    /// List every tool, following `nextCursor` pagination
    async fn list_tools_internal(&self) -> Result<Vec<McpTool>, McpError> {
        debug!("Listing MCP tools");

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = ToolsListParams {
                cursor: cursor.take(),
            };
            let page: ToolsListResult = self.send_request("tools/list", Some(params)).await?;

            for tool in &page.tools {
                trace!(tool_name = %tool.name, description = ?tool.description, "Found MCP tool");
            }
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(pages = MAX_TOOL_PAGES, "Stopped following tools/list pagination");
        Ok(tools)
    }

    /// Refresh the list of available tools
    pub async fn refresh_tools(&mut self) -> Result<&[McpTool], McpError> {
        self.ensure_initialized()?;
        self.tools = self.list_tools_internal().await?;
        Ok(&self.tools)
    }

    /// Get the cached list of available tools
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn get_tool(&self, name: &str) -> Option<&McpTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.get_tool(name).is_some()
    }

    /// Call a tool on the MCP server
    ///
    /// ```rust,ignore
    /// let result = client.call_tool("read_file", serde_json::json!({"path": "/tmp/test.txt"})).await?;
    /// ```
    #[instrument(skip(self, arguments), fields(tool_name = %name))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, McpError> {
        self.ensure_initialized()?;

        if !self.has_tool(name) {
            warn!(tool_name = %name, "Calling unknown tool");
        }

        // Servers reject `null` arguments; an empty object is the neutral value.
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };

        let params = ToolCallParams {
            name: name.to_string(),
            arguments,
        };

        let result: McpToolResult = self.send_request("tools/call", Some(params)).await?;

        if result.is_error {
            warn!(tool_name = %name, "Tool returned error result");
        } else {
            debug!(
                tool_name = %name,
                content_count = result.content.len(),
                "Tool call successful"
            );
        }

        Ok(result)
    }

    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server_info.as_ref()
    }

    /// Usage instructions the server returned during initialization
    pub fn instructions(&self) -> Option<&str> {
        self.server_info
            .as_ref()
            .and_then(|info| info.instructions.as_deref())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Close the client connection
    pub async fn close(&self) -> Result<(), McpError> {
        debug!("Closing MCP client connection");
        let mut transport = self.transport.lock().await;
        transport.close().await?;
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    // ========================================
    // Internal Helper Methods
    // ========================================

    fn ensure_initialized(&self) -> Result<(), McpError> {
        if !self.is_initialized() {
            return Err(McpError::NotInitialized);
        }
        Ok(())
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_request<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, McpError> {
        let id = self.next_request_id();

        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(serde_json::to_value(p)?);
        }

        let request_json = serde_json::to_string(&request)?;
        trace!(method = %method, id = %id, "Sending JSON-RPC request");

        // The lock spans the whole request/response cycle so concurrent
        // callers cannot interleave and steal each other's responses.
        let response = timeout(self.config.request_timeout, async {
            let mut transport = self.transport.lock().await;

            transport.send(&request_json).await?;

            loop {
                let raw = transport.receive().await?;
                let message: IncomingMessage = serde_json::from_str(&raw)?;

                match message {
                    IncomingMessage::Response(response) if is_stale(&response.id, &id) => {
                        debug!(
                            expected = %id,
                            stale = %response.id,
                            "Discarding late response to an earlier request"
                        );
                    }
                    IncomingMessage::Response(response) => {
                        return Ok::<JsonRpcResponse, McpError>(response);
                    }
                    IncomingMessage::Notification(notif) => {
                        trace!(
                            method = %notif.method,
                            "Received server notification while awaiting response, skipping"
                        );
                    }
                    IncomingMessage::Request(server_request) => {
                        let reply = Self::reply_to_server_request(&server_request);
                        transport.send(&serde_json::to_string(&reply)?).await?;
                    }
                }
            }
        })
        .await
        .map_err(|_| McpError::Timeout(self.config.request_timeout))??;

        if response.id != id {
            return Err(McpError::ResponseIdMismatch {
                expected: id.to_string(),
                actual: response.id.to_string(),
            });
        }

        let result = response.into_result()?;
        serde_json::from_value(result).map_err(McpError::from)
    }

    /// Answer requests a server sends mid-exchange. Only `ping` is supported.
    fn reply_to_server_request(request: &ServerRequest) -> JsonRpcReply {
        debug!(method = %request.method, id = %request.id, "Answering server request");
        match request.method.as_str() {
            "ping" => JsonRpcReply::result(request.id.clone(), Value::Object(Default::default())),
            other => JsonRpcReply::error(
                request.id.clone(),
                error_codes::METHOD_NOT_FOUND,
                format!("Client does not support {}", other),
            ),
        }
    }

    async fn send_notification<P: Serialize>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<(), McpError> {
        let mut notification = JsonRpcNotification::new(method);
        if let Some(p) = params {
            notification = notification.with_params(serde_json::to_value(p)?);
        }

        let notification_json = serde_json::to_string(&notification)?;
        trace!(method = %method, "Sending JSON-RPC notification");

        let mut transport = self.transport.lock().await;
        transport.send(&notification_json).await
    }
}

/// A numeric response id below the current request's belongs to a request
/// that already timed out.
fn is_stale(received: &RequestId, current: &RequestId) -> bool {
    matches!(
        (received, current),
        (RequestId::Number(received), RequestId::Number(current)) if received < current
    )
}
