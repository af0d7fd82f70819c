//! Locating `mcp.json` in the standard places.

use std::path::{Path, PathBuf};
use tracing::debug;

pub const MCP_CONFIG_FILE: &str = "mcp.json";

/// Candidate locations for `mcp.json`, searched in order:
///
/// 1. `~/.deepagents/mcp.json` (user config)
/// 2. `~/.config/deepagents/mcp.json`
/// 3. `<cwd>/mcp.json`
/// 4. `<project root>/mcp.json`, the nearest ancestor of cwd holding `.git`
#[derive(Debug, Clone)]
pub struct McpSearchPaths {
    home: Option<PathBuf>,
    cwd: PathBuf,
}

impl McpSearchPaths {
    pub fn new(home: Option<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home,
            cwd: cwd.into(),
        }
    }

    /// Search paths for the current user and working directory.
    pub fn from_env() -> Self {
        let home = directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(home, cwd)
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(4);
        if let Some(home) = &self.home {
            paths.push(home.join(".deepagents").join(MCP_CONFIG_FILE));
            paths.push(home.join(".config").join("deepagents").join(MCP_CONFIG_FILE));
        }
        paths.push(self.cwd.join(MCP_CONFIG_FILE));
        if let Some(root) = project_root(&self.cwd) {
            let candidate = root.join(MCP_CONFIG_FILE);
            if !paths.contains(&candidate) {
                paths.push(candidate);
            }
        }
        paths
    }

    /// First candidate that exists on disk.
    pub fn find(&self) -> Option<PathBuf> {
        let found = self.candidates().into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => debug!(path = %path.display(), "Found MCP config"),
            None => debug!("No MCP config found in standard locations"),
        }
        found
    }
}

/// Nearest ancestor of `start` (inclusive) that contains a `.git` entry.
pub fn project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.parent().is_some() && dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Find `mcp.json` for the current user and working directory.
pub fn find_mcp_config() -> Option<PathBuf> {
    McpSearchPaths::from_env().find()
}
