use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::panic_message;
use crate::tool::{DispatchError, ToolChoice, ToolRegistry, ToolResult, ValidatorSet};

/// Looks up, validates and invokes the tool the model chose.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    validators: ValidatorSet,
}

impl Dispatcher {
    /// Creates a dispatcher over a fully registered tool set.
    pub fn new(registry: Arc<ToolRegistry>, validators: ValidatorSet) -> Self {
        Self {
            registry,
            validators,
        }
    }

    /// The tools this dispatcher can reach.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs a single tool choice. Never fails: every error becomes a
    /// [`ToolResult::Failure`].
    ///
    /// `llm_output` is the raw model reply, kept for diagnosing invocation errors.
    pub async fn dispatch(&self, choice: &ToolChoice, llm_output: &str) -> ToolResult {
        match self.try_dispatch(choice, llm_output).await {
            Ok(payload) => ToolResult::success(payload),
            Err(error) => {
                warn!(tool = %choice.tool_name, %error, "Dispatch failed");
                error.into_failure()
            }
        }
    }

    async fn try_dispatch(
        &self,
        choice: &ToolChoice,
        llm_output: &str,
    ) -> Result<serde_json::Value, DispatchError> {
        let tool = self
            .registry
            .lookup(&choice.tool_name)
            .ok_or_else(|| DispatchError::UnknownTool(choice.tool_name.clone()))?
            .clone();

        self.validators.validate(&choice.tool_name, &choice.args)?;

        info!(tool = %choice.tool_name, "Invoking tool");
        debug!(args = %serde_json::Value::Object(choice.args.clone()), "Tool arguments");

        let invocation = AssertUnwindSafe(tool.invoke(choice.args.clone()))
            .catch_unwind()
            .await;

        match invocation {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(error)) => Err(DispatchError::Invocation {
                llm_output: llm_output.to_string(),
                exception: error.to_string(),
            }),
            Err(panic) => Err(DispatchError::Invocation {
                llm_output: llm_output.to_string(),
                exception: panic_message(&*panic),
            }),
        }
    }
}
