//! `deepagents mcp`: show what the MCP configuration provides.

use deepagents::tools::create_filesystem_tools;
use deepagents_mcp::{load_mcp_tools, McpLoadOptions, McpSearchPaths, McpToolset, ServerStatus};
use std::path::PathBuf;

/// Built-in tool names are reserved so MCP tools cannot shadow them.
pub fn load_options(config_path: Option<PathBuf>) -> McpLoadOptions {
    let builtins = create_filesystem_tools();
    let mut options = McpLoadOptions::default()
        .with_reserved_names(builtins.iter().map(|tool| tool.schema().name));
    if let Some(path) = config_path {
        options = options.with_config_path(path);
    }
    options
}

pub async fn handle_mcp(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let toolset = load_mcp_tools(load_options(config_path)).await;
    print!("{}", render_report(&toolset));
    if toolset.config_path.is_none() {
        println!("Searched:");
        for candidate in McpSearchPaths::from_env().candidates() {
            println!("  {}", candidate.display());
        }
    }
    toolset.shutdown().await;
    Ok(())
}

pub fn render_report(toolset: &McpToolset) -> String {
    let mut out = String::new();
    let Some(path) = &toolset.config_path else {
        out.push_str("No mcp.json found.\n");
        return out;
    };

    out.push_str(&format!("Config: {}\n", path.display()));
    if toolset.servers.is_empty() {
        out.push_str("No MCP servers loaded.\n");
        return out;
    }

    for server in &toolset.servers {
        match &server.status {
            ServerStatus::Connected { tool_count } => out.push_str(&format!(
                "  ✓ {} ({}) - {} tool(s)\n",
                server.name, server.transport, tool_count
            )),
            ServerStatus::Failed { error } => out.push_str(&format!(
                "  ✗ {} ({}) - {}\n",
                server.name, server.transport, error
            )),
        }
    }

    if !toolset.tools.is_empty() {
        out.push_str("Tools:\n");
        for tool in &toolset.tools {
            let schema = tool.schema();
            out.push_str(&format!("  {:<32} {}\n", schema.name, schema.description));
        }
    }
    out
}
