//! Interactive session loop, console approvals and event rendering.

use async_trait::async_trait;
use deepagents::DeepAgent;
use deepagents_core::events::{preview, AgentEvent, EventSink};
use deepagents_core::hitl::{ApprovalRequest, Approver, HitlAction};
use deepagents_core::session::{Session, SessionStore};
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Tools,
    Clear,
    Exit,
    Unknown(String),
}

/// Slash commands; anything else is a message for the agent.
pub fn parse_command(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    let name = line.strip_prefix('/')?.split_whitespace().next().unwrap_or("");
    Some(match name {
        "help" | "?" => ReplCommand::Help,
        "tools" => ReplCommand::Tools,
        "clear" | "new" => ReplCommand::Clear,
        "exit" | "quit" | "q" => ReplCommand::Exit,
        other => ReplCommand::Unknown(other.to_string()),
    })
}

/// `y`/`yes` approves; `n <reason>` (or `no <reason>`) rejects with a reason;
/// anything else rejects.
pub fn parse_approval(input: &str) -> HitlAction {
    let input = input.trim();
    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "y" | "yes" if rest.is_empty() => HitlAction::Approve,
        "n" | "no" if !rest.is_empty() => HitlAction::Reject {
            reason: Some(rest.to_string()),
        },
        _ => HitlAction::Reject { reason: None },
    }
}

/// Read one line from stdin without blocking the runtime; `None` on EOF.
pub async fn read_line(prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let (read, line) = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok::<_, io::Error>((read, line))
    })
    .await??;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Asks on the terminal before gated tools run.
pub struct StdinApprover;

#[async_trait]
impl Approver for StdinApprover {
    async fn review(&self, request: &ApprovalRequest) -> anyhow::Result<HitlAction> {
        let args = serde_json::to_string_pretty(&request.args)?;
        println!("\n⚠ {} wants to run with:", request.tool_name);
        for line in args.lines() {
            println!("    {line}");
        }
        match read_line("Approve? [y/N, or n <reason>] ").await? {
            Some(answer) => Ok(parse_approval(&answer)),
            None => Ok(HitlAction::Reject {
                reason: Some("no input available".to_string()),
            }),
        }
    }
}

/// Prints tool activity as the agent works.
pub struct ConsoleEvents;

impl EventSink for ConsoleEvents {
    fn emit(&self, event: AgentEvent) {
        println!("{}", render_event(&event));
    }
}

pub fn render_event(event: &AgentEvent) -> String {
    match event {
        AgentEvent::ToolStarted { tool_name, args } => {
            format!("  → {tool_name}({})", preview(&args.to_string(), 120))
        }
        AgentEvent::ToolCompleted {
            tool_name,
            output_preview,
        } => format!(
            "  ✓ {tool_name}: {}",
            preview(&output_preview.replace('\n', " "), 120)
        ),
        AgentEvent::ToolFailed { tool_name, error } => {
            format!("  ✗ {tool_name}: {}", preview(&error.replace('\n', " "), 200))
        }
        AgentEvent::ToolRejected { tool_name, reason } => match reason {
            Some(reason) => format!("  ⊘ {tool_name} rejected: {reason}"),
            None => format!("  ⊘ {tool_name} rejected"),
        },
    }
}

/// A fresh session, or with `resume` the newest saved one. A resumed
/// session continues on `model`.
pub async fn open_session<S: SessionStore>(
    store: &S,
    resume: bool,
    model: &str,
) -> anyhow::Result<Session> {
    if !resume {
        return Ok(Session::new(model));
    }
    match store.latest().await? {
        Some(mut session) => {
            println!(
                "Resuming session {} ({} messages)",
                session.id,
                session.messages.len()
            );
            if session.model != model {
                tracing::info!(
                    from = %session.model,
                    to = %model,
                    "Resumed session switches model"
                );
                session.model = model.to_string();
            }
            Ok(session)
        }
        None => {
            println!("No previous session found; starting a new one.");
            Ok(Session::new(model))
        }
    }
}

const HELP: &str = "\
Commands:
  /help    Show this help
  /tools   List available tools
  /clear   Start a new conversation
  /exit    Quit (also /quit, Ctrl-D)";

pub struct Repl<S: SessionStore> {
    agent: DeepAgent,
    store: S,
    session: Session,
}

impl<S: SessionStore> Repl<S> {
    pub fn new(agent: DeepAgent, store: S, session: Session) -> Self {
        Self {
            agent,
            store,
            session,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let Some(line) = read_line("\n> ").await? else {
                println!();
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match parse_command(input) {
                Some(ReplCommand::Exit) => break,
                Some(command) => self.handle_command(command),
                None => self.turn(input).await,
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, command: ReplCommand) {
        match command {
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Tools => {
                for schema in self.agent.tools().schemas() {
                    println!("  {:<32} {}", schema.name, preview(&schema.description, 80));
                }
            }
            ReplCommand::Clear => {
                self.agent.clear_history();
                self.session = Session::new(self.agent.model_id());
                println!("Started a new conversation.");
            }
            ReplCommand::Unknown(name) => {
                println!("Unknown command '/{name}'. Type /help for commands.");
            }
            ReplCommand::Exit => {}
        }
    }

    async fn turn(&mut self, input: &str) {
        match self.agent.run_turn(input).await {
            Ok(reply) => println!("\n{}", reply.text().trim()),
            Err(err) => eprintln!("Error: {err:#}"),
        }
        self.persist().await;
    }

    /// Save the conversation so `-r` can pick it up; failures only warn.
    async fn persist(&mut self) {
        self.session.record(self.agent.history().to_vec());
        if let Err(err) = self.store.save(&self.session).await {
            tracing::warn!(session_id = %self.session.id, error = %err, "Failed to save session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepagents_core::llm::{LanguageModel, LlmRequest, LlmResponse};
    use deepagents_core::messaging::AgentMessage;
    use deepagents_core::session::InMemorySessionStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
            let last = request.messages.last().map(AgentMessage::text).unwrap_or_default();
            Ok(LlmResponse {
                message: AgentMessage::agent(format!("echo: {last}")),
            })
        }

        fn model_id(&self) -> String {
            "test/echo".into()
        }
    }

    #[test]
    fn parses_slash_commands() {
        assert_eq!(parse_command("/help"), Some(ReplCommand::Help));
        assert_eq!(parse_command("  /tools "), Some(ReplCommand::Tools));
        assert_eq!(parse_command("/clear"), Some(ReplCommand::Clear));
        assert_eq!(parse_command("/exit"), Some(ReplCommand::Exit));
        assert_eq!(parse_command("/quit"), Some(ReplCommand::Exit));
        assert_eq!(
            parse_command("/frobnicate now"),
            Some(ReplCommand::Unknown("frobnicate".into()))
        );
        assert_eq!(parse_command("explain /etc/hosts"), None);
    }

    #[test]
    fn parses_approval_answers() {
        assert_eq!(parse_approval("y"), HitlAction::Approve);
        assert_eq!(parse_approval(" YES "), HitlAction::Approve);
        assert_eq!(parse_approval(""), HitlAction::Reject { reason: None });
        assert_eq!(parse_approval("n"), HitlAction::Reject { reason: None });
        assert_eq!(
            parse_approval("n  wrong file, use src/lib.rs"),
            HitlAction::Reject {
                reason: Some("wrong file, use src/lib.rs".into())
            }
        );
        assert_eq!(
            parse_approval("no not today"),
            HitlAction::Reject {
                reason: Some("not today".into())
            }
        );
        assert_eq!(parse_approval("yes please"), HitlAction::Reject { reason: None });
    }

    #[test]
    fn renders_events_on_one_line() {
        let started = AgentEvent::ToolStarted {
            tool_name: "read_file".into(),
            args: json!({"file_path": "a.txt"}),
        };
        assert_eq!(render_event(&started), r#"  → read_file({"file_path":"a.txt"})"#);

        let done = AgentEvent::ToolCompleted {
            tool_name: "ls".into(),
            output_preview: "a\nb".into(),
        };
        assert_eq!(render_event(&done), "  ✓ ls: a b");

        let rejected = AgentEvent::ToolRejected {
            tool_name: "write_file".into(),
            reason: None,
        };
        assert_eq!(render_event(&rejected), "  ⊘ write_file rejected");
    }

    #[tokio::test]
    async fn resumed_sessions_switch_to_the_requested_model() {
        let store = InMemorySessionStore::new();
        let mut saved = Session::new("openai/gpt-4o-mini");
        saved.record(vec![AgentMessage::user("hi"), AgentMessage::agent("hello")]);
        store.save(&saved).await.unwrap();

        let resumed = open_session(&store, true, "deepseek/deepseek-chat").await.unwrap();
        assert_eq!(resumed.id, saved.id);
        assert_eq!(resumed.model, "deepseek/deepseek-chat");
        assert_eq!(resumed.messages.len(), 2);

        let fresh = open_session(&store, false, "openai/gpt-4o").await.unwrap();
        assert_ne!(fresh.id, saved.id);
        assert_eq!(fresh.model, "openai/gpt-4o");

        let empty = InMemorySessionStore::new();
        let started = open_session(&empty, true, "openai/gpt-4o").await.unwrap();
        assert!(started.messages.is_empty());
    }

    #[tokio::test]
    async fn turns_are_saved_and_clear_starts_fresh() {
        let agent = DeepAgent::builder(Arc::new(EchoModel)).build();
        let session = Session::new("test/echo");
        let first_id = session.id.clone();
        let mut repl = Repl::new(agent, InMemorySessionStore::new(), session);

        repl.turn("hello").await;

        let saved = repl.store.load(&first_id).await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), 2);
        assert_eq!(saved.messages[1].text(), "echo: hello");

        repl.handle_command(ReplCommand::Clear);
        assert!(repl.agent.history().is_empty());
        assert_ne!(repl.session.id, first_id);
        assert_eq!(repl.session.model, "test/echo");
    }
}
