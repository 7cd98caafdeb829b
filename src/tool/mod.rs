pub mod executor;
pub mod registry;
pub mod signature;
pub mod validator;

pub use executor::Dispatcher;
pub use registry::ToolRegistry;
pub use signature::{params_from_schema, render_signature, render_signatures};
pub use tool_trait::{DynTool, Tool};
pub use tool_types::{
    DispatchError, ParamSpec, ParamType, ToolChoice, ToolError, ToolResult, decode_args,
};
pub use validator::{ArgumentCheck, RequiredIdentifier, ValidatorSet};

mod tool_types {
    use serde::de::DeserializeOwned;
    use serde_json::{Map, Value};

    /// JSON-level type of a declared tool parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ParamType {
        String,
        Integer,
        Number,
        Boolean,
        Array,
        Object,
    }

    impl ParamType {
        /// The tag shown to the model in a rendered signature.
        pub fn name(&self) -> &'static str {
            match self {
                ParamType::String => "string",
                ParamType::Integer => "integer",
                ParamType::Number => "number",
                ParamType::Boolean => "boolean",
                ParamType::Array => "array",
                ParamType::Object => "object",
            }
        }
    }

    /// A single parameter in a tool's signature.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ParamSpec {
        /// The parameter name, as the model must spell it
        pub name: String,
        /// Declared type, if any
        pub param_type: Option<ParamType>,
        /// Whether the parameter may be omitted
        pub has_default: bool,
    }

    impl ParamSpec {
        /// Creates a required parameter.
        pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
            Self {
                name: name.into(),
                param_type: Some(param_type),
                has_default: false,
            }
        }

        /// Creates a parameter that falls back to a default when omitted.
        pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
            Self {
                name: name.into(),
                param_type: Some(param_type),
                has_default: true,
            }
        }

        /// Creates a parameter with no declared type.
        pub fn untyped(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                param_type: None,
                has_default: false,
            }
        }

        /// Returns the type tag, `text` when nothing was declared.
        pub fn type_name(&self) -> &'static str {
            self.param_type.map(|t| t.name()).unwrap_or("text")
        }
    }

    /// The model's decision for a single turn.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ToolChoice {
        /// Name of the tool to invoke
        pub tool_name: String,
        /// Named arguments for the tool
        pub args: Map<String, Value>,
    }

    impl ToolChoice {
        /// Creates a new tool choice.
        pub fn new(tool_name: impl Into<String>, args: Map<String, Value>) -> Self {
            Self {
                tool_name: tool_name.into(),
                args,
            }
        }
    }

    /// Outcome of validating and invoking a tool.
    #[derive(Debug, Clone, PartialEq)]
    pub enum ToolResult {
        /// The tool returned normally
        Success(Value),
        /// The turn failed before or during invocation
        Failure {
            kind: String,
            message: String,
            context: Map<String, Value>,
        },
    }

    impl ToolResult {
        /// Creates a successful result.
        pub fn success(payload: Value) -> Self {
            ToolResult::Success(payload)
        }

        /// Creates a failure with an empty context.
        pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
            ToolResult::Failure {
                kind: kind.into(),
                message: message.into(),
                context: Map::new(),
            }
        }

        /// Adds a context entry to a failure. Successes are returned unchanged.
        pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
            if let ToolResult::Failure { context, .. } = &mut self {
                context.insert(key.into(), value.into());
            }
            self
        }

        /// Returns whether the tool produced a payload.
        pub fn is_success(&self) -> bool {
            matches!(self, ToolResult::Success(_))
        }

        /// The JSON shown to the model when rendering the answer.
        ///
        /// A failure becomes `{"<kind>": "<message>", ...context}`.
        pub fn to_json(&self) -> Value {
            match self {
                ToolResult::Success(payload) => payload.clone(),
                ToolResult::Failure {
                    kind,
                    message,
                    context,
                } => {
                    let mut obj = Map::new();
                    obj.insert(kind.clone(), Value::String(message.clone()));
                    for (key, value) in context {
                        obj.insert(key.clone(), value.clone());
                    }
                    Value::Object(obj)
                }
            }
        }
    }

    /// Errors that can occur when executing a tool.
    #[derive(Debug, thiserror::Error)]
    pub enum ToolError {
        #[error("Invalid arguments: {0}")]
        InvalidArguments(String),
        #[error("Execution failed: {0}")]
        ExecutionFailed(String),
        #[error("Tool not found: {0}")]
        NotFound(String),
    }

    /// Everything that can go wrong between the model's reply and a tool's return.
    ///
    /// None of these escape a turn: each converts into a [`ToolResult::Failure`].
    #[derive(Debug, thiserror::Error)]
    pub enum DispatchError {
        /// The structured-choice reply could not be decoded, even after repair.
        #[error("Invalid JSON returned by LLM: {raw} ({reason})")]
        MalformedToolChoice { raw: String, reason: String },
        /// The chosen tool is not registered.
        #[error("Unknown tool '{0}'")]
        UnknownTool(String),
        /// A pre-invocation check rejected the arguments.
        #[error("{0}")]
        Validation(String),
        /// The tool itself failed.
        #[error("Error executing function: {exception}")]
        Invocation { llm_output: String, exception: String },
        /// The structured-choice call never produced a reply.
        #[error("Tool selection failed: {0}")]
        ChoiceBackend(String),
    }

    impl DispatchError {
        /// Converts the error into the failure value handed to the formatter.
        pub fn into_failure(self) -> ToolResult {
            match self {
                DispatchError::MalformedToolChoice { ref raw, .. } => {
                    let exception = self.to_string();
                    ToolResult::failure("error", "Error executing function")
                        .with_context("llm_output", raw.clone())
                        .with_context("exception", exception)
                }
                DispatchError::UnknownTool(_) => ToolResult::failure("error", self.to_string()),
                DispatchError::Validation(message) => ToolResult::failure("error", message),
                DispatchError::Invocation {
                    llm_output,
                    exception,
                } => ToolResult::failure("error", "Error executing function")
                    .with_context("llm_output", llm_output)
                    .with_context("exception", exception),
                DispatchError::ChoiceBackend(exception) => {
                    ToolResult::failure("error", "Error executing function")
                        .with_context("llm_output", "No response")
                        .with_context("exception", exception)
                }
            }
        }
    }

    impl From<DispatchError> for ToolResult {
        fn from(error: DispatchError) -> Self {
            error.into_failure()
        }
    }

    /// Decodes a generic argument mapping into a tool's typed argument struct.
    pub fn decode_args<T: DeserializeOwned>(args: &Map<String, Value>) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(args.clone()))
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))
    }
}

mod tool_trait {
    use super::tool_types::{ParamSpec, ToolError};
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::Arc;

    /// An operation the model can select by name.
    #[async_trait]
    pub trait Tool: Send + Sync {
        /// Returns the name of the tool.
        fn name(&self) -> &str;
        /// Returns a description of what the tool does.
        fn description(&self) -> &str;
        /// Returns the ordered parameter signature.
        fn parameters(&self) -> Vec<ParamSpec>;

        /// Invokes the tool with named arguments.
        async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError>;
    }

    /// A type alias for a dynamic tool reference.
    pub type DynTool = Arc<dyn Tool>;
}
