//! MCP Error Types

use crate::protocol::messages::JsonRpcError;
use thiserror::Error;

/// Errors raised while talking to an MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// JSON-RPC error returned by the server
    #[error("MCP server error: {0}")]
    ServerError(#[from] JsonRpcError),

    /// Transport-level error (I/O, connection, HTTP status, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (unexpected message format, version mismatch, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Timeout waiting for response
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Client not initialized
    #[error("Client not initialized - call initialize() first")]
    NotInitialized,

    /// Process spawn error
    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(String),

    /// Process exited unexpectedly
    #[error("MCP server process exited unexpectedly")]
    ProcessExited,

    /// Invalid response ID
    #[error("Response ID mismatch: expected {expected}, got {actual}")]
    ResponseIdMismatch { expected: String, actual: String },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    pub fn transport(msg: impl Into<String>) -> Self {
        McpError::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        McpError::Protocol(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, McpError::Timeout(_))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, McpError::ServerError(_))
    }

    pub fn is_process_exited(&self) -> bool {
        matches!(self, McpError::ProcessExited)
    }
}

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = McpError::ResponseIdMismatch {
            expected: "1".into(),
            actual: "7".into(),
        };
        assert_eq!(err.to_string(), "Response ID mismatch: expected 1, got 7");
    }

    #[test]
    fn test_server_error_display_includes_code() {
        let err = McpError::from(JsonRpcError {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        });
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "MCP server error: [-32601] Method not found");
    }

    #[test]
    fn test_error_checks() {
        assert!(McpError::Timeout(std::time::Duration::from_secs(5)).is_timeout());
        assert!(!McpError::ProcessExited.is_timeout());
        assert!(McpError::ProcessExited.is_process_exited());
        assert!(matches!(
            McpError::transport("connection refused"),
            McpError::Transport(_)
        ));
    }
}
