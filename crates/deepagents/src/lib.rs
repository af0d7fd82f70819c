//! # deepagents
//!
//! The runtime behind the `deepagents` CLI: a tool-calling agent loop over
//! any OpenAI-compatible chat model, built-in filesystem tools, an approval
//! gate for side-effecting calls, and file-backed session persistence.
//!
//! ```rust,ignore
//! use deepagents::{DeepAgent, providers::{OpenAiChatModel, OpenAiConfig}};
//!
//! let model = OpenAiChatModel::new(OpenAiConfig::new(Some(key), "gpt-4o-mini"))?;
//! let mut agent = DeepAgent::builder(Arc::new(model))
//!     .with_tools(deepagents::tools::create_filesystem_tools())
//!     .auto_approve(true)
//!     .build();
//! let reply = agent.run_turn("List the files here").await?;
//! ```

pub mod agent;
pub mod prompts;
pub mod providers;
pub mod sessions;
pub mod tools;

pub use agent::{AgentConfig, AgentError, DeepAgent, DeepAgentBuilder, DEFAULT_MAX_ITERATIONS};
pub use sessions::FileSessionStore;

pub use deepagents_core as core;
pub use deepagents_core::session::{InMemorySessionStore, Session, SessionStore};
