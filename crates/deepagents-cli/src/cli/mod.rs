//! Command-line surface for `deepagents`.

pub mod mcp;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const AFTER_HELP: &str = "\
Environment:
  OPENAI_API_KEY      API key (required for hosted providers)
  OPENAI_BASE_URL     OpenAI-compatible endpoint (default: https://api.openai.com/v1)
  <PROVIDER>_API_KEY  Per-provider key, e.g. OPENROUTER_API_KEY, DEEPSEEK_API_KEY
  <PROVIDER>_BASE_URL Per-provider endpoint
  DEEPAGENTS_MODEL    Default model when --model is not given
  RUST_LOG            Log filter (default: warn)

Variables are also read from ./.env and ~/.deepagents/.env.
MCP servers are loaded from mcp.json in ~/.deepagents, ~/.config/deepagents,
the current directory or the project root.

In a session: /help, /tools, /clear, /exit";

/// Deep agent in your terminal
#[derive(Parser, Debug)]
#[command(
    name = "deepagents",
    version,
    about = "Deep agent in your terminal: tool calling, approvals, MCP servers",
    after_help = AFTER_HELP
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model as provider/model-name (e.g. openai/gpt-4o-mini, openrouter/anthropic/claude-3.5-sonnet)
    #[arg(short, long, value_name = "PROVIDER/MODEL", global = true)]
    pub model: Option<String>,

    /// Run file edits and MCP tools without asking for approval
    #[arg(long)]
    pub auto_approve: bool,

    /// Resume the most recent session
    #[arg(short = 'r', long)]
    pub resume: bool,

    /// Use this mcp.json instead of searching the standard locations
    #[arg(long, value_name = "PATH", global = true)]
    pub mcp_config: Option<PathBuf>,

    /// Do not load MCP servers
    #[arg(long, global = true, conflicts_with = "mcp_config")]
    pub no_mcp: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List configured MCP servers and the tools they provide
    Mcp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_session_flags() {
        let cli = Cli::try_parse_from([
            "deepagents",
            "--model",
            "openrouter/anthropic/claude-3.5-sonnet",
            "--auto-approve",
            "-r",
        ])
        .unwrap();

        assert_eq!(cli.command, None);
        assert_eq!(cli.model.as_deref(), Some("openrouter/anthropic/claude-3.5-sonnet"));
        assert!(cli.auto_approve);
        assert!(cli.resume);
        assert!(!cli.no_mcp);
    }

    #[test]
    fn parses_mcp_subcommand_with_global_flags() {
        let cli = Cli::try_parse_from(["deepagents", "mcp", "--mcp-config", "/tmp/mcp.json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Mcp));
        assert_eq!(cli.mcp_config, Some(PathBuf::from("/tmp/mcp.json")));
    }

    #[test]
    fn help_and_version_are_available() {
        let help = Cli::try_parse_from(["deepagents", "help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        let version = Cli::try_parse_from(["deepagents", "--version"]).unwrap_err();
        assert_eq!(version.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn no_mcp_conflicts_with_explicit_config() {
        assert!(Cli::try_parse_from(["deepagents", "--no-mcp", "--mcp-config", "x.json"]).is_err());
    }
}
