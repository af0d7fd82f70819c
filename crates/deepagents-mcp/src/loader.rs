//! Loading every configured MCP server as agent tools.
//!
//! Each server entry is planned into a concrete connection (stdio process or
//! HTTP endpoint), connected concurrently, and its tools adapted. A server
//! that fails to start is reported and skipped; loading itself never fails.

use crate::client::{McpClient, McpClientConfig, DEFAULT_TIMEOUT};
use crate::config::{try_load_mcp_config, McpConfig, McpServerConfig};
use crate::discovery::find_mcp_config;
use crate::protocol::McpError;
use crate::tool_adapter::create_mcp_tools;
use deepagents_core::tools::ToolBox;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Host platform, for the process-spawning quirks that differ between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// How to reach one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerConnection {
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl ServerConnection {
    pub fn transport_name(&self) -> &'static str {
        match self {
            ServerConnection::Stdio { .. } => "stdio",
            ServerConnection::Http { .. } => "http",
        }
    }
}

/// Commands that are `.cmd` shims on Windows and cannot be spawned directly.
const WINDOWS_SHIMMED: &[&str] = &["npx", "node"];

/// Turn a config entry into a concrete connection for `platform`.
///
/// A `command` beginning with `http` is a server URL. On Windows, `npx` and
/// `node` are run through `cmd.exe /c`.
pub fn plan_connection(server: &McpServerConfig, platform: Platform) -> ServerConnection {
    if server.is_http() {
        return ServerConnection::Http {
            url: server.command.clone(),
            headers: server.headers.clone(),
        };
    }

    let (command, args) =
        if platform == Platform::Windows && WINDOWS_SHIMMED.contains(&server.command.as_str()) {
            let mut args = vec!["/c".to_string(), server.command.clone()];
            args.extend(server.args.iter().cloned());
            ("cmd.exe".to_string(), args)
        } else {
            (server.command.clone(), server.args.clone())
        };

    ServerConnection::Stdio {
        command,
        args,
        env: server.env.clone(),
    }
}

/// Open a connection and run the MCP handshake.
pub async fn connect(
    connection: &ServerConnection,
    config: McpClientConfig,
) -> Result<McpClient, McpError> {
    match connection {
        #[cfg(feature = "stdio")]
        ServerConnection::Stdio { command, args, env } => {
            use crate::transport::stdio::{StdioConfig, StdioTransport};

            let mut stdio = StdioConfig::new(command).args(args.iter().cloned());
            for (key, value) in env {
                stdio = stdio.env(key, value);
            }
            let transport = StdioTransport::spawn_with_config(stdio).await?;
            McpClient::connect_with_config(transport, config).await
        }
        #[cfg(feature = "http")]
        ServerConnection::Http { url, headers } => {
            use crate::transport::http::HttpTransport;

            let transport = HttpTransport::new(url.clone())
                .with_headers(headers.clone())
                .with_timeout_secs(config.request_timeout.as_secs().max(1))
                .build()?;
            McpClient::connect_with_config(transport, config).await
        }
        #[allow(unreachable_patterns)]
        other => Err(McpError::transport(format!(
            "{} transport is not enabled in this build",
            other.transport_name()
        ))),
    }
}

/// Options for [`load_mcp_tools`]
#[derive(Debug, Clone)]
pub struct McpLoadOptions {
    /// Explicit config path; `None` searches the standard locations
    pub config_path: Option<PathBuf>,

    pub request_timeout: Duration,

    pub platform: Platform,

    /// Tool names already taken (built-in tools); MCP tools that would
    /// shadow them are skipped
    pub reserved_names: BTreeSet<String>,
}

impl Default for McpLoadOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            request_timeout: DEFAULT_TIMEOUT,
            platform: Platform::current(),
            reserved_names: BTreeSet::new(),
        }
    }
}

impl McpLoadOptions {
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Outcome of loading one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Connected { tool_count: usize },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct ServerReport {
    pub name: String,
    pub transport: &'static str,
    pub status: ServerStatus,
}

impl ServerReport {
    pub fn is_connected(&self) -> bool {
        matches!(self.status, ServerStatus::Connected { .. })
    }
}

/// Tools loaded from every reachable server, plus the clients that back them
#[derive(Default)]
pub struct McpToolset {
    pub config_path: Option<PathBuf>,
    pub tools: Vec<ToolBox>,
    pub servers: Vec<ServerReport>,
    clients: Vec<(String, Arc<McpClient>)>,
}

impl McpToolset {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.servers.iter().filter(|s| s.is_connected()).count()
    }

    /// Usage notes servers returned at initialization, keyed by server name
    pub fn instructions(&self) -> Vec<(String, String)> {
        self.clients
            .iter()
            .filter_map(|(name, client)| {
                client
                    .instructions()
                    .map(|text| (name.clone(), text.to_string()))
            })
            .collect()
    }

    /// Close every server connection. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        for (name, client) in &self.clients {
            if let Err(err) = client.close().await {
                warn!(server = %name, error = %err, "Failed to close MCP server");
            }
        }
    }
}

/// Load tools from the configured MCP servers.
///
/// With no explicit path the standard locations are searched; a missing or
/// unreadable config yields an empty toolset.
pub async fn load_mcp_tools(options: McpLoadOptions) -> McpToolset {
    let config_path = match options.config_path.clone().or_else(find_mcp_config) {
        Some(path) => path,
        None => return McpToolset::default(),
    };

    let Some(config) = try_load_mcp_config(&config_path) else {
        return McpToolset {
            config_path: Some(config_path),
            ..McpToolset::default()
        };
    };

    info!(path = %config_path.display(), servers = config.len(), "Loading MCP servers");
    let mut toolset = load_mcp_tools_from_config(&config, &options).await;
    toolset.config_path = Some(config_path);
    toolset
}

/// Connect to every server in `config` concurrently.
#[instrument(skip_all, fields(servers = config.len()))]
pub async fn load_mcp_tools_from_config(config: &McpConfig, options: &McpLoadOptions) -> McpToolset {
    let client_config = McpClientConfig {
        request_timeout: options.request_timeout,
        ..McpClientConfig::default()
    };

    let attempts = config.servers.iter().map(|(name, server)| {
        let connection = plan_connection(server, options.platform);
        let client_config = client_config.clone();
        async move {
            let result = connect(&connection, client_config).await;
            (name.clone(), connection.transport_name(), result)
        }
    });

    let mut toolset = McpToolset::default();
    let mut taken = options.reserved_names.clone();
    for (name, transport, result) in join_all(attempts).await {
        match result {
            Ok(client) => {
                let client = Arc::new(client);
                let tools: Vec<ToolBox> = create_mcp_tools(client.clone(), Some(&name))
                    .into_iter()
                    .filter(|tool| {
                        let tool_name = tool.schema().name;
                        let fresh = taken.insert(tool_name.clone());
                        if !fresh {
                            warn!(
                                server = %name,
                                tool = %tool_name,
                                "Skipping MCP tool whose name is already taken"
                            );
                        }
                        fresh
                    })
                    .collect();
                info!(server = %name, transport, tool_count = tools.len(), "MCP server ready");
                toolset.servers.push(ServerReport {
                    name: name.clone(),
                    transport,
                    status: ServerStatus::Connected {
                        tool_count: tools.len(),
                    },
                });
                toolset.tools.extend(tools);
                toolset.clients.push((name, client));
            }
            Err(err) => {
                warn!(server = %name, transport, error = %err, "Failed to load MCP server");
                toolset.servers.push(ServerReport {
                    name,
                    transport,
                    status: ServerStatus::Failed {
                        error: err.to_string(),
                    },
                });
            }
        }
    }

    info!(
        tool_count = toolset.tools.len(),
        connected = toolset.connected_count(),
        configured = config.len(),
        "Loaded MCP tools"
    );
    toolset
}
