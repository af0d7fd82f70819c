//! `mcp.json` configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": {
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"],
//!       "env": {}
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration for a single MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Executable to spawn, or an `http(s)://` URL for remote servers
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Extra request headers for HTTP servers (e.g. authorization)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl McpServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Remote servers are configured with a URL in place of a command.
    pub fn is_http(&self) -> bool {
        self.command.starts_with("http")
    }
}

/// Full MCP configuration from `mcp.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfig {
    /// Servers keyed by name, iterated in name order
    #[serde(rename = "mcpServers")]
    pub servers: BTreeMap<String, McpServerConfig>,
}

impl McpConfig {
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }
}

impl std::str::FromStr for McpConfig {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Error)]
pub enum McpConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid MCP config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load MCP configuration from a JSON file.
///
/// A missing file is not an error and yields `Ok(None)`.
pub fn load_mcp_config(path: impl AsRef<Path>) -> Result<Option<McpConfig>, McpConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "No MCP config at path");
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|source| McpConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: McpConfig = raw.parse().map_err(|source| McpConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), servers = config.len(), "Loaded MCP config");
    Ok(Some(config))
}

/// Lenient variant of [`load_mcp_config`]: failures are logged and yield `None`.
pub fn try_load_mcp_config(path: impl AsRef<Path>) -> Option<McpConfig> {
    let path = path.as_ref();
    match load_mcp_config(path) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to load MCP config");
            None
        }
    }
}
