use std::path::PathBuf;

use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Model calls allowed per user turn before the agent gives up
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub max_iterations: usize,
    /// Run gated tools without asking the approver
    pub auto_approve: bool,
    /// Directory tools resolve relative paths against
    pub working_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            auto_approve: false,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}
