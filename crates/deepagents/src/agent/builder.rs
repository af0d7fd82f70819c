//! Fluent construction of a [`DeepAgent`]

use super::config::AgentConfig;
use super::runtime::DeepAgent;
use deepagents_core::events::{EventSink, NoopEventSink};
use deepagents_core::hitl::Approver;
use deepagents_core::llm::LanguageModel;
use deepagents_core::messaging::AgentMessage;
use deepagents_core::tools::{ToolBox, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;

pub struct DeepAgentBuilder {
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    approver: Option<Arc<dyn Approver>>,
    events: Arc<dyn EventSink>,
    config: AgentConfig,
    history: Vec<AgentMessage>,
}

impl DeepAgentBuilder {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            tools: ToolRegistry::new(),
            approver: None,
            events: Arc::new(NoopEventSink),
            config: AgentConfig::default(),
            history: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: ToolBox) -> Self {
        self.tools.register(tool);
        self
    }

    /// Register several tools; a later tool replaces an earlier one of the same name.
    pub fn with_tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        self.tools.register_all(tools);
        self
    }

    /// Who decides on gated tool calls. Without one, gated calls are
    /// rejected unless auto-approve is on.
    pub fn with_approver(mut self, approver: Arc<dyn Approver>) -> Self {
        self.approver = Some(approver);
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Values below one are raised to one.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations.max(1);
        self
    }

    pub fn auto_approve(mut self, enabled: bool) -> Self {
        self.config.auto_approve = enabled;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = dir.into();
        self
    }

    /// Seed the conversation, e.g. from a resumed session.
    pub fn with_history(mut self, history: Vec<AgentMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn build(self) -> DeepAgent {
        DeepAgent::from_parts(
            self.model,
            self.tools,
            self.approver,
            self.events,
            self.config,
            self.history,
        )
    }
}
