pub mod agent_loop;
pub mod formatter;
pub mod parser;
pub mod prompt;

pub use agent_loop::{Agent, AgentConfig, TurnState};
pub use formatter::{ResponseFormatter, fallback_render};
pub use parser::parse_tool_choice;
