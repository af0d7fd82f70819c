use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Decision taken by a human for a gated tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitlAction {
    Approve,
    Reject { reason: Option<String> },
}

/// A tool call waiting for approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub args: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[async_trait]
pub trait Approver: Send + Sync {
    async fn review(&self, request: &ApprovalRequest) -> anyhow::Result<HitlAction>;
}
