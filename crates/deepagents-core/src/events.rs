//! Events emitted by the agent loop while it works through a turn

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolStarted {
        tool_name: String,
        args: serde_json::Value,
    },
    ToolCompleted {
        tool_name: String,
        output_preview: String,
    },
    ToolFailed {
        tool_name: String,
        error: String,
    },
    ToolRejected {
        tool_name: String,
        reason: Option<String>,
    },
}

impl AgentEvent {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            AgentEvent::ToolStarted { .. } => "tool_started",
            AgentEvent::ToolCompleted { .. } => "tool_completed",
            AgentEvent::ToolFailed { .. } => "tool_failed",
            AgentEvent::ToolRejected { .. } => "tool_rejected",
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            AgentEvent::ToolStarted { tool_name, .. }
            | AgentEvent::ToolCompleted { tool_name, .. }
            | AgentEvent::ToolFailed { tool_name, .. }
            | AgentEvent::ToolRejected { tool_name, .. } => tool_name,
        }
    }
}

/// Receiver for agent events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: AgentEvent) {}
}

/// Shorten tool output for display, respecting char boundaries.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_type_tag() {
        let event = AgentEvent::ToolRejected {
            tool_name: "write_file".into(),
            reason: Some("not now".into()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "tool_rejected");
        assert_eq!(event.event_type_name(), "tool_rejected");
        assert_eq!(event.tool_name(), "write_file");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo wörld", 5), "héllo…");
        assert_eq!(preview("short", 10), "short");
    }
}
