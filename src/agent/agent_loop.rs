use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::agent::formatter::ResponseFormatter;
use crate::agent::parser::parse_tool_choice;
use crate::agent::prompt::{DEFAULT_SYSTEM_PROMPT, choice_prompt};
use crate::llm::LLMClient;
use crate::tool::{DispatchError, Dispatcher, ToolRegistry, ToolResult, ValidatorSet, render_signatures};

/// Tool name reported to the formatter for any failed turn.
const ERROR_TOOL_NAME: &str = "error";

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Prepended to every structured-choice prompt
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Dispatching,
    Formatting,
    Exiting,
}

/// Single-turn router: pick one tool, run it, describe the result.
///
/// Holds no conversation history; every call to [`Agent::handle_turn`] is
/// independent of the ones before it.
#[derive(Clone)]
pub struct Agent {
    llm_client: Arc<dyn LLMClient>,
    dispatcher: Dispatcher,
    formatter: ResponseFormatter,
    config: AgentConfig,
}

impl Agent {
    /// Creates a new agent with the standard argument checks.
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self::with_validators(llm_client, registry, ValidatorSet::standard(), config)
    }

    /// Creates a new agent with custom argument checks.
    pub fn with_validators(
        llm_client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        validators: ValidatorSet,
        config: AgentConfig,
    ) -> Self {
        Self {
            formatter: ResponseFormatter::new(llm_client.clone()),
            dispatcher: Dispatcher::new(registry, validators),
            llm_client,
            config,
        }
    }

    /// Names of the tools the model can choose from.
    pub fn tool_names(&self) -> Vec<String> {
        self.dispatcher.registry().list_names()
    }

    /// Processes one line of user input into the text to show the user.
    pub async fn handle_turn(&self, user_input: &str) -> String {
        let turn_id = Uuid::new_v4();
        async move {
            debug!(state = ?TurnState::Dispatching, "Turn started");
            let (result, tool_name) = self.select_and_dispatch(user_input).await;

            debug!(state = ?TurnState::Formatting, success = result.is_success(), "Tool finished");
            self.formatter.format(user_input, &result, &tool_name).await
        }
        .instrument(info_span!("turn", %turn_id))
        .await
    }

    /// Runs the structured-choice call and the chosen tool.
    ///
    /// Returns the result together with the tool name to report to the
    /// formatter (`error` whenever the turn failed).
    async fn select_and_dispatch(&self, user_input: &str) -> (ToolResult, String) {
        let signatures = render_signatures(self.dispatcher.registry());
        let prompt = choice_prompt(&self.config.system_prompt, &signatures, user_input);

        let reply = match self.llm_client.structured_choice(&prompt).await {
            Ok(reply) => reply,
            Err(error) => {
                let failure = DispatchError::ChoiceBackend(error.to_string()).into_failure();
                return (failure, ERROR_TOOL_NAME.to_string());
            }
        };

        let raw = reply.raw_text();
        debug!(raw = %raw, "LLM raw response");

        let choice = match parse_tool_choice(&reply) {
            Ok(choice) => choice,
            Err(error) => {
                warn!(%error, "Could not decode tool choice");
                return (error.into_failure(), ERROR_TOOL_NAME.to_string());
            }
        };
        info!(tool = %choice.tool_name, "Model selected tool");

        let result = self.dispatcher.dispatch(&choice, &raw).await;
        let tool_name = if result.is_success() {
            choice.tool_name
        } else {
            ERROR_TOOL_NAME.to_string()
        };
        (result, tool_name)
    }
}
