//! MCP Transport Layer
//!
//! Transports move raw JSON-RPC messages to and from a server. The client
//! owns framing-independent concerns (IDs, timeouts, notifications).

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "stdio")]
pub mod stdio;

use crate::protocol::McpError;
use async_trait::async_trait;

/// Transport trait for MCP communication
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to the MCP server
    async fn send(&mut self, message: &str) -> Result<(), McpError>;

    /// Receive the next message from the MCP server
    async fn receive(&mut self) -> Result<String, McpError>;

    /// Close the transport connection
    async fn close(&mut self) -> Result<(), McpError>;

    /// Check if the transport is still connected
    fn is_connected(&self) -> bool;
}
