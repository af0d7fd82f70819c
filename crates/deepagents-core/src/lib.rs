//! Core traits and shared data models for deepagents.
//! This crate keeps the domain primitives lightweight so the runtime, the MCP
//! integration, and the CLI can compose them without pulling in heavy deps.

pub mod events;
pub mod hitl;
pub mod llm;
pub mod messaging;
pub mod session;
pub mod tools;

pub use events::{AgentEvent, EventSink, NoopEventSink};
pub use hitl::{ApprovalRequest, Approver, HitlAction};
pub use llm::{LanguageModel, LlmRequest, LlmResponse};
pub use messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole, ToolInvocation};
pub use session::{InMemorySessionStore, Session, SessionId, SessionStore, SessionSummary};
pub use tools::{
    Tool, ToolBox, ToolContext, ToolParameterSchema, ToolRegistry, ToolResult, ToolSchema,
};
