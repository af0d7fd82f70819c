use async_trait::async_trait;
use deepagents_core::llm::{LanguageModel, LlmRequest, LlmResponse};
use deepagents_core::messaging::{
    AgentMessage, MessageContent, MessageMetadata, MessageRole, ToolInvocation,
};
use deepagents_core::tools::{ToolParameterSchema, ToolSchema};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token; local servers such as Ollama need none.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Provider label used in `model_id` and error messages.
    pub provider: String,
}

impl OpenAiConfig {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            provider: "openai".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Chat model speaking the OpenAI Chat Completions protocol with function calling.
pub struct OpenAiChatModel {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent(concat!("deepagents-cli/", env!("CARGO_PKG_VERSION")))
                .build()?,
            config,
        })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [OpenAiMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    /// `null` is allowed on assistant messages that only call tools.
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Serialize)]
struct OpenAiTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAiFunction<'a>,
}

#[derive(Serialize)]
struct OpenAiFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a ToolParameterSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    /// JSON-encoded arguments, as the model produced them
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

fn to_openai_tools(schemas: &[ToolSchema]) -> Vec<OpenAiTool<'_>> {
    schemas
        .iter()
        .map(|schema| OpenAiTool {
            kind: "function",
            function: OpenAiFunction {
                name: &schema.name,
                description: &schema.description,
                parameters: &schema.parameters,
            },
        })
        .collect()
}

fn to_openai_messages(request: &LlmRequest) -> Vec<OpenAiMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(OpenAiMessage::text("system", request.system_prompt.clone()));

    // Tool results are only valid directly after an assistant turn that asked for them.
    let mut awaiting_results = false;

    for msg in &request.messages {
        match msg.role {
            MessageRole::User => {
                awaiting_results = false;
                messages.push(OpenAiMessage::text("user", msg.text()));
            }
            MessageRole::System => {
                awaiting_results = false;
                messages.push(OpenAiMessage::text("system", msg.text()));
            }
            MessageRole::Agent => {
                let calls = msg.tool_calls();
                awaiting_results = !calls.is_empty();
                let text = msg.text();
                messages.push(OpenAiMessage {
                    role: "assistant",
                    content: if text.is_empty() && !calls.is_empty() {
                        None
                    } else {
                        Some(text)
                    },
                    tool_calls: calls
                        .iter()
                        .enumerate()
                        .map(|(idx, call)| OpenAiToolCall {
                            id: call
                                .tool_call_id
                                .clone()
                                .unwrap_or_else(|| format!("call_{idx}")),
                            kind: function_kind(),
                            function: OpenAiFunctionCall {
                                name: call.tool_name.clone(),
                                arguments: call.args.to_string(),
                            },
                        })
                        .collect(),
                    tool_call_id: None,
                });
            }
            MessageRole::Tool => {
                if !awaiting_results {
                    tracing::warn!("Skipping tool message without preceding tool_calls");
                    continue;
                }
                messages.push(OpenAiMessage {
                    role: "tool",
                    content: Some(msg.text()),
                    tool_calls: Vec::new(),
                    tool_call_id: msg.tool_call_id().map(str::to_string),
                });
            }
        }
    }
    messages
}

fn parse_arguments(name: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            tracing::warn!(tool = %name, arguments = %other, "Tool arguments are not an object");
            Value::Object(Default::default())
        }
        Err(err) => {
            tracing::warn!(tool = %name, error = %err, "Failed to parse tool arguments");
            Value::Object(Default::default())
        }
    }
}

fn to_agent_message(message: ChoiceMessage) -> AgentMessage {
    let tool_calls: Vec<ToolInvocation> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolInvocation {
            args: parse_arguments(&call.function.name, &call.function.arguments),
            tool_name: call.function.name,
            tool_call_id: Some(call.id),
        })
        .collect();

    AgentMessage {
        role: MessageRole::Agent,
        content: MessageContent::Text(message.content.unwrap_or_default()),
        metadata: (!tool_calls.is_empty()).then(|| MessageMetadata {
            tool_call_id: None,
            tool_calls,
        }),
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        let messages = to_openai_messages(&request);
        let body = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            tools: to_openai_tools(&request.tools),
        };
        let url = self.config.endpoint();

        tracing::debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            messages = messages.len(),
            tools = body.tools.len(),
            "Chat completion request"
        );

        let mut http = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }
        let response = http.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %error_text, "Chat completion failed");
            return Err(anyhow::anyhow!(
                "{} API error: {} - {}",
                self.config.provider,
                status,
                error_text
            ));
        }

        let data: ChatResponse = response.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("{} response missing choices", self.config.provider))?;

        let message = to_agent_message(choice.message);
        tracing::debug!(tool_calls = message.tool_calls().len(), "Chat completion received");
        Ok(LlmResponse { message })
    }

    fn model_id(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.model)
    }
}
