//! # Weather Agent
//!
//! A natural-language front end over a fixed set of weather-data queries.
//!
//! Each line of user input is one independent turn:
//!
//! 1. The registered tools' signatures are rendered into a prompt and the
//!    model picks one tool plus arguments (the structured-choice call).
//! 2. The reply is decoded into a [`ToolChoice`], repairing near-miss JSON once.
//! 3. Per-tool argument checks run, then the tool is invoked.
//! 4. The result, success or failure, goes back to the model to be phrased
//!    as prose (the free-text call), with a deterministic fallback.
//!
//! No failure inside a turn escapes it; the user always gets a printed answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weather_agent::prelude::*;
//! use weather_agent::weather::{InMemoryStore, register_weather_tools};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm_client = LLMClientBuilder::new()
//!         .with_api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build_openai()?;
//!
//!     let store = Arc::new(InMemoryStore::load("sample_weatherdata.json")?);
//!     let mut registry = ToolRegistry::new();
//!     register_weather_tools(&mut registry, store);
//!
//!     let agent = Agent::new(llm_client, Arc::new(registry), AgentConfig::default());
//!     println!("{}", agent.handle_turn("how many records for PLAT").await);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod repl;
pub mod tool;
pub mod weather;

// Re-exports for convenient usage
pub use agent::{Agent, AgentConfig, ResponseFormatter, TurnState};
pub use config::{AppConfig, Cli, ConfigError};
pub use error::AppError;
pub use llm::{LLMClient, LLMClientBuilder, LLMError, OpenAIClient, StructuredReply};
pub use tool::{
    DispatchError, Dispatcher, DynTool, ParamSpec, ParamType, Tool, ToolChoice, ToolError,
    ToolRegistry, ToolResult, ValidatorSet,
};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::agent::{Agent, AgentConfig};
    pub use crate::llm::{LLMClient, LLMClientBuilder, StructuredReply};
    pub use crate::tool::{DynTool, ParamSpec, ParamType, Tool, ToolError, ToolRegistry, ToolResult};
}
