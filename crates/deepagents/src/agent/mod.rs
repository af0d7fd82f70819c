//! The tool-calling agent loop
//!
//! - `config`: loop limits, approval mode and working directory
//! - `builder`: fluent construction
//! - `runtime`: the loop itself

pub mod builder;
pub mod config;
pub mod runtime;

pub use builder::DeepAgentBuilder;
pub use config::{AgentConfig, DEFAULT_MAX_ITERATIONS};
pub use runtime::{AgentError, DeepAgent};
