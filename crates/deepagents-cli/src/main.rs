//! `deepagents` binary entry point.

mod cli;
mod repl;
mod settings;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use deepagents::prompts::{build_system_prompt, default_memory_path, load_memory};
use deepagents::providers::OpenAiChatModel;
use deepagents::tools::create_filesystem_tools;
use deepagents::{DeepAgent, FileSessionStore};
use deepagents_mcp::{load_mcp_tools, McpToolset};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use repl::{open_session, ConsoleEvents, Repl, StdinApprover};
use settings::{ProviderSettings, SettingsError};

const VERBOSE_FILTER: &str =
    "deepagents=debug,deepagents_core=debug,deepagents_mcp=debug,deepagents_cli=debug,warn";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if matches!(
                err.downcast_ref::<SettingsError>(),
                Some(SettingsError::MissingApiKey { .. })
            ) {
                eprintln!("Hint: create a .env file containing OPENAI_API_KEY=<your key>");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let home = settings::home_dir();
    settings::load_env_files(&cwd, home.as_deref())?;

    match cli.command {
        Some(Commands::Mcp) => cli::mcp::handle_mcp(cli.mcp_config).await,
        None => interactive(cli, cwd).await,
    }
}

async fn interactive(cli: Cli, cwd: PathBuf) -> anyhow::Result<()> {
    let spec = settings::resolve_model_spec(cli.model.as_deref(), settings::process_env)?;
    let provider = ProviderSettings::resolve(&spec, settings::process_env)?;
    tracing::debug!(?provider, "Resolved model provider");
    let model = Arc::new(OpenAiChatModel::new(provider.openai_config())?);

    let toolset = if cli.no_mcp {
        McpToolset::default()
    } else {
        load_mcp_tools(cli::mcp::load_options(cli.mcp_config)).await
    };

    let store = FileSessionStore::from_home()?;
    let session = open_session(&store, cli.resume, &spec.to_string()).await?;
    let history = session.messages.clone();

    let mcp_tool_count = toolset.tools.len();
    let agent = DeepAgent::builder(model)
        .with_system_prompt(system_prompt(&cwd, &toolset))
        .with_tools(create_filesystem_tools())
        .with_tools(toolset.tools.iter().cloned())
        .with_approver(Arc::new(StdinApprover))
        .with_event_sink(Arc::new(ConsoleEvents))
        .auto_approve(cli.auto_approve)
        .with_working_dir(&cwd)
        .with_history(history)
        .build();

    print_banner(&agent, &toolset, mcp_tool_count);

    let mut repl = Repl::new(agent, store, session);
    let result = repl.run().await;
    toolset.shutdown().await;
    result
}

fn system_prompt(cwd: &Path, toolset: &McpToolset) -> String {
    let memory = default_memory_path().and_then(|path| load_memory(&path));
    let mut prompt = build_system_prompt(cwd, memory.as_deref());
    let notes = toolset.instructions();
    if !notes.is_empty() {
        prompt.push_str("\n\n## MCP server notes");
        for (server, text) in notes {
            prompt.push_str(&format!("\n\n### {server}\n{}", text.trim()));
        }
    }
    prompt
}

fn print_banner(agent: &DeepAgent, toolset: &McpToolset, mcp_tool_count: usize) {
    println!("deepagents {}", env!("CARGO_PKG_VERSION"));
    println!("  model: {}", agent.model_id());
    println!(
        "  tools: {} ({} from {} MCP server(s))",
        agent.tools().len(),
        mcp_tool_count,
        toolset.connected_count()
    );
    for failed in toolset.servers.iter().filter(|s| !s.is_connected()) {
        println!("  ! MCP server '{}' failed to start", failed.name);
    }
    if agent.config().auto_approve {
        println!("  auto-approve: on");
    }
    println!("Type /help for commands, /exit to quit.");
}
