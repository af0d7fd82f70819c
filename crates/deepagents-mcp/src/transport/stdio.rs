//! Stdio Transport for MCP
//!
//! Spawns an MCP server as a subprocess and talks to it over stdin/stdout
//! using newline-delimited JSON. The server's stderr is forwarded to tracing.

use crate::protocol::McpError;
use crate::transport::Transport;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, error, trace, warn};

/// Stdio Transport Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioConfig {
    /// Command to run (e.g., "npx", "uvx", "node")
    pub command: String,

    pub args: Vec<String>,

    /// Variables layered on top of the inherited environment
    pub env: BTreeMap<String, String>,

    pub working_dir: Option<PathBuf>,
}

impl StdioConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Stdio Transport
///
/// Owns the child process; the process is killed when the transport is
/// closed or dropped.
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    connected: bool,
    command_str: String,
}

impl StdioTransport {
    /// Spawn a new MCP server process
    ///
    /// ```rust,ignore
    /// let transport = StdioTransport::spawn("npx", &["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]).await?;
    /// ```
    pub async fn spawn(command: &str, args: &[&str]) -> Result<Self, McpError> {
        let config = StdioConfig::new(command).args(args.iter().copied());
        Self::spawn_with_config(config).await
    }

    /// Spawn a new MCP server process with full configuration
    pub async fn spawn_with_config(config: StdioConfig) -> Result<Self, McpError> {
        let command_str = config.display();
        debug!(command = %command_str, "Spawning MCP server process");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!(error = %e, command = %command_str, "Failed to spawn MCP server");
            McpError::ProcessSpawn(format!("{}: {}", command_str, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::ProcessSpawn("Failed to capture stdin".to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::ProcessSpawn("Failed to capture stdout".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let server = command_str.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(command = %server, "mcp stderr: {}", line);
                }
            });
        }

        debug!(command = %command_str, "MCP server process spawned");

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            connected: true,
            command_str,
        })
    }

    /// Check if the child process is still running
    pub fn check_process(&mut self) -> Result<(), McpError> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.connected = false;
                warn!(
                    command = %self.command_str,
                    exit_code = ?status.code(),
                    "MCP server process exited"
                );
                Err(McpError::ProcessExited)
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.connected = false;
                Err(McpError::Io(e))
            }
        }
    }

    pub async fn kill(&mut self) -> Result<(), McpError> {
        debug!(command = %self.command_str, "Killing MCP server process");
        self.child.kill().await.map_err(McpError::Io)?;
        self.connected = false;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.check_process()?;

        trace!(message = %message, "Sending message to MCP server");

        let mut frame = String::with_capacity(message.len() + 1);
        frame.push_str(message);
        frame.push('\n');

        self.stdin
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("Write failed: {}", e)))?;

        self.stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    async fn receive(&mut self) -> Result<String, McpError> {
        loop {
            let mut line = String::new();
            let bytes_read = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| McpError::Transport(format!("Read failed: {}", e)))?;

            if bytes_read == 0 {
                self.connected = false;
                return Err(McpError::ProcessExited);
            }

            let line = line.trim();
            // Some servers print banners or blank lines on stdout; only JSON objects are frames.
            if !line.starts_with('{') {
                if !line.is_empty() {
                    debug!(command = %self.command_str, "Ignoring non-JSON stdout line: {}", line);
                }
                continue;
            }

            trace!(message = %line, "Received message from MCP server");
            return Ok(line.to_string());
        }
    }

    async fn close(&mut self) -> Result<(), McpError> {
        if self.connected {
            debug!(command = %self.command_str, "Closing MCP server connection");

            // Closing stdin is the graceful shutdown signal for stdio servers.
            let _ = self.stdin.shutdown().await;
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            if self.check_process().is_ok() {
                self.kill().await?;
            }
            self.connected = false;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        if self.connected {
            let _ = self.child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_config() {
        let config = StdioConfig::new("npx")
            .args(["-y", "@modelcontextprotocol/server-filesystem"])
            .arg("/tmp")
            .env("DEBUG", "true")
            .working_dir("/home/user");

        assert_eq!(config.command, "npx");
        assert_eq!(config.args.len(), 3);
        assert_eq!(config.env.get("DEBUG").map(String::as_str), Some("true"));
        assert_eq!(config.working_dir, Some(PathBuf::from("/home/user")));
        assert_eq!(
            config.display(),
            "npx -y @modelcontextprotocol/server-filesystem /tmp"
        );
    }

    #[tokio::test]
    async fn test_spawn_missing_command_fails() {
        let result = StdioTransport::spawn("deepagents-no-such-binary-xyz", &[]).await;
        assert!(matches!(result, Err(McpError::ProcessSpawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_roundtrip_skips_noise() {
        let script = r#"echo "starting up"; while IFS= read -r line; do echo "$line"; done"#;
        let mut transport = StdioTransport::spawn("sh", &["-c", script]).await.unwrap();

        transport.send(r#"{"jsonrpc":"2.0","method":"x"}"#).await.unwrap();
        let received = transport.receive().await.unwrap();
        assert_eq!(received, r#"{"jsonrpc":"2.0","method":"x"}"#);

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }
}
