//! Model providers
//!
//! Every provider is reached through the OpenAI Chat Completions wire format;
//! routing to OpenRouter, DeepSeek, Groq or a local Ollama is a matter of
//! base URL and credentials.

pub mod openai;

pub use openai::{OpenAiChatModel, OpenAiConfig, DEFAULT_OPENAI_BASE_URL};
