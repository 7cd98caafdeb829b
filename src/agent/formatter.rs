use std::sync::Arc;
use tracing::{debug, warn};

use crate::agent::prompt::format_prompt;
use crate::llm::LLMClient;
use crate::tool::ToolResult;

/// Renders tool results as conversational text via the model's free-text call.
#[derive(Clone)]
pub struct ResponseFormatter {
    llm: Arc<dyn LLMClient>,
}

impl ResponseFormatter {
    /// Creates a formatter that renders through `llm`'s free-text call.
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Asks the model to describe `result` in answer to `user_query`.
    ///
    /// Falls back to [`fallback_render`] when the model call fails or replies
    /// with nothing, so the returned text is never empty.
    pub async fn format(&self, user_query: &str, result: &ToolResult, tool_name: &str) -> String {
        let result_json = pretty(result);
        let prompt = format_prompt(user_query, tool_name, &result_json);
        debug!(tool = %tool_name, "Requesting natural language rendering");

        match self.llm.free_text(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Formatting call returned empty text");
                fallback_render(result, "empty response from LLM")
            }
            Err(error) => {
                warn!(%error, "Formatting call failed");
                fallback_render(result, &error.to_string())
            }
        }
    }
}

/// Deterministic rendering used when the model cannot format a result.
pub fn fallback_render(result: &ToolResult, reason: &str) -> String {
    format!(
        "Found data for your query: {}\n(Note: LLM formatting failed: {})",
        pretty(result),
        reason
    )
}

fn pretty(result: &ToolResult) -> String {
    let json = result.to_json();
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}
