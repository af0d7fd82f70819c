use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::messaging::{AgentMessage, ToolInvocation};
use crate::tools::ToolSchema;

/// Request passed to a language model for one completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub messages: Vec<AgentMessage>,
    /// Tools the model may call; empty disables tool calling.
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Assistant message; requested tool calls live in its metadata.
    pub message: AgentMessage,
}

impl LlmResponse {
    pub fn tool_calls(&self) -> &[ToolInvocation] {
        self.message.tool_calls()
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse>;

    /// Identifier shown to users, e.g. `openai/gpt-4o-mini`.
    fn model_id(&self) -> String;
}
