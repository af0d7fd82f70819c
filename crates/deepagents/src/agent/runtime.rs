//! DeepAgent runtime
//!
//! One user turn: the model is called with the full history and every tool
//! schema; requested tool calls are executed (after approval where a tool is
//! gated) and their results appended, until the model answers without tool
//! calls or the iteration limit is reached.

use super::builder::DeepAgentBuilder;
use super::config::AgentConfig;
use anyhow::Context;
use deepagents_core::events::{preview, AgentEvent, EventSink};
use deepagents_core::hitl::{ApprovalRequest, Approver, HitlAction};
use deepagents_core::llm::{LanguageModel, LlmRequest};
use deepagents_core::messaging::{AgentMessage, ToolInvocation};
use deepagents_core::tools::{ToolContext, ToolRegistry};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const OUTPUT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent stopped after {0} iterations without a final answer")]
    MaxIterations(usize),
}

pub struct DeepAgent {
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    approver: Option<Arc<dyn Approver>>,
    events: Arc<dyn EventSink>,
    config: AgentConfig,
    history: Vec<AgentMessage>,
}

impl DeepAgent {
    pub fn builder(model: Arc<dyn LanguageModel>) -> DeepAgentBuilder {
        DeepAgentBuilder::new(model)
    }

    pub(super) fn from_parts(
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        approver: Option<Arc<dyn Approver>>,
        events: Arc<dyn EventSink>,
        config: AgentConfig,
        history: Vec<AgentMessage>,
    ) -> Self {
        Self {
            model,
            tools,
            approver,
            events,
            config,
            history,
        }
    }

    pub fn model_id(&self) -> String {
        self.model.model_id()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn history(&self) -> &[AgentMessage] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn set_auto_approve(&mut self, enabled: bool) {
        self.config.auto_approve = enabled;
    }

    /// Run one user turn and return the model's final answer.
    #[instrument(skip_all, fields(model = %self.model.model_id()))]
    pub async fn run_turn(&mut self, input: impl Into<String>) -> anyhow::Result<AgentMessage> {
        self.history.push(AgentMessage::user(input));
        let schemas = self.tools.schemas();

        for iteration in 1..=self.config.max_iterations {
            let request = LlmRequest {
                system_prompt: self.config.system_prompt.clone(),
                messages: self.history.clone(),
                tools: schemas.clone(),
            };
            let response = self
                .model
                .generate(request)
                .await
                .context("model request failed")?;

            let message = response.message;
            let calls = message.tool_calls().to_vec();
            self.history.push(message.clone());

            if calls.is_empty() {
                debug!(iteration, "Turn finished");
                return Ok(message);
            }

            debug!(iteration, tool_calls = calls.len(), "Model requested tools");
            let mut pending = calls.into_iter();
            while let Some(call) = pending.next() {
                let call_id = call.tool_call_id.clone();
                match self.dispatch(call).await {
                    Ok(result) => self.history.push(result),
                    Err(err) => {
                        // Every tool call needs a result or the provider rejects
                        // the history on the next turn.
                        self.history
                            .push(AgentMessage::tool(format!("Error: {err:#}"), call_id));
                        for skipped in pending {
                            self.history.push(AgentMessage::tool(
                                "Error: tool call skipped after an approval failure",
                                skipped.tool_call_id,
                            ));
                        }
                        return Err(err);
                    }
                }
            }
        }

        warn!(max_iterations = self.config.max_iterations, "Iteration limit reached");
        Err(AgentError::MaxIterations(self.config.max_iterations).into())
    }

    /// Execute one tool call, always producing a tool message for the model.
    /// Only approver failures propagate.
    async fn dispatch(&self, call: ToolInvocation) -> anyhow::Result<AgentMessage> {
        let call_id = call.tool_call_id.clone();

        let Some(tool) = self.tools.get(&call.tool_name).cloned() else {
            warn!(tool_name = %call.tool_name, "Model requested unknown tool");
            let error = format!("unknown tool '{}'", call.tool_name);
            self.events.emit(AgentEvent::ToolFailed {
                tool_name: call.tool_name,
                error: error.clone(),
            });
            return Ok(AgentMessage::tool(format!("Error: {error}"), call_id));
        };

        if tool.requires_approval() && !self.config.auto_approve {
            let action = match &self.approver {
                Some(approver) => {
                    let request = ApprovalRequest {
                        tool_name: call.tool_name.clone(),
                        args: call.args.clone(),
                        tool_call_id: call_id.clone(),
                    };
                    approver.review(&request).await?
                }
                None => HitlAction::Reject {
                    reason: Some("no approver available".to_string()),
                },
            };

            if let HitlAction::Reject { reason } = action {
                info!(tool_name = %call.tool_name, reason = ?reason, "Tool call rejected");
                let text = match &reason {
                    Some(reason) if !reason.trim().is_empty() => {
                        format!("Tool call rejected by user: {}", reason.trim())
                    }
                    _ => "Tool call rejected by user".to_string(),
                };
                self.events.emit(AgentEvent::ToolRejected {
                    tool_name: call.tool_name,
                    reason,
                });
                return Ok(AgentMessage::tool(text, call_id));
            }
        }

        self.events.emit(AgentEvent::ToolStarted {
            tool_name: call.tool_name.clone(),
            args: call.args.clone(),
        });

        let ctx = ToolContext::new(&self.config.working_dir).with_call_id(call_id.clone());
        match tool.execute(call.args, ctx).await {
            Ok(result) => {
                let text = result.message.text();
                let event = if result.is_error {
                    AgentEvent::ToolFailed {
                        tool_name: call.tool_name,
                        error: text,
                    }
                } else {
                    AgentEvent::ToolCompleted {
                        tool_name: call.tool_name,
                        output_preview: preview(&text, OUTPUT_PREVIEW_CHARS),
                    }
                };
                self.events.emit(event);
                Ok(result.message)
            }
            Err(err) => {
                warn!(tool_name = %call.tool_name, error = %err, "Tool execution failed");
                self.events.emit(AgentEvent::ToolFailed {
                    tool_name: call.tool_name,
                    error: format!("{err:#}"),
                });
                Ok(AgentMessage::tool(format!("Error: {err:#}"), call_id))
            }
        }
    }
}
