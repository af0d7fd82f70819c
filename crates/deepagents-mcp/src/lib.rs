//! # deepagents-mcp
//!
//! Model Context Protocol (MCP) support for the deepagents CLI.
//!
//! - **Config**: `mcp.json` parsing and discovery in the standard locations
//! - **Client**: JSON-RPC 2.0 handshake, tool listing and tool calls
//! - **Transports**: spawned stdio processes and streamable HTTP
//! - **Loader**: connects every configured server and adapts its tools,
//!   skipping servers that fail
//!
//! ## Example
//!
//! ```rust,ignore
//! use deepagents_mcp::{load_mcp_tools, McpLoadOptions};
//!
//! let toolset = load_mcp_tools(McpLoadOptions::default()).await;
//! for tool in &toolset.tools {
//!     println!("{}", tool.schema().name);
//! }
//! toolset.shutdown().await;
//! ```

pub mod config;
pub mod discovery;
pub mod loader;
pub mod protocol;
pub mod transport;

mod client;
mod tool_adapter;

pub use client::{McpClient, McpClientConfig, DEFAULT_TIMEOUT};
pub use config::{load_mcp_config, try_load_mcp_config, McpConfig, McpConfigError, McpServerConfig};
pub use discovery::{find_mcp_config, McpSearchPaths};
pub use loader::{
    load_mcp_tools, load_mcp_tools_from_config, plan_connection, McpLoadOptions, McpToolset,
    Platform, ServerConnection, ServerReport, ServerStatus,
};
pub use protocol::{
    error::McpError,
    types::{McpContent, McpTool, McpToolResult},
};
pub use tool_adapter::{create_mcp_tools, exposed_name, McpToolAdapter};

#[cfg(feature = "http")]
pub use transport::http::HttpTransport;
#[cfg(feature = "stdio")]
pub use transport::stdio::{StdioConfig, StdioTransport};
