use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAIClient;

/// Reply from a structured-choice call.
///
/// Adapters normalize whatever their backend returns into one of these two
/// shapes before it reaches the dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredReply {
    /// Raw model text, still to be decoded
    Text(String),
    /// An already-decoded mapping
    Mapping(Map<String, Value>),
}

impl StructuredReply {
    /// The reply as text, for logs and error context.
    pub fn raw_text(&self) -> String {
        match self {
            StructuredReply::Text(text) => text.clone(),
            StructuredReply::Mapping(map) => Value::Object(map.clone()).to_string(),
        }
    }
}

/// Errors that can occur when communicating with an LLM.
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// An API error occurred
    #[error("API error: {0}")]
    ApiError(String),
    /// A network error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    /// The response from the LLM was invalid
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The response carried no content
    #[error("Empty response from LLM")]
    EmptyResponse,
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),
    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),
}

/// The two calls the dispatch loop makes against a language model.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Asks the model to pick a tool and its arguments.
    async fn structured_choice(&self, prompt: &str) -> Result<StructuredReply, LLMError>;
    /// Asks the model for plain prose. Never returns an empty string.
    async fn free_text(&self, prompt: &str) -> Result<String, LLMError>;
}

/// A builder for creating LLM clients.
#[derive(Debug, Default)]
pub struct LLMClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    max_tokens: Option<u32>,
    router_temperature: Option<f32>,
    narrator_temperature: Option<f32>,
}

impl LLMClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets sampling temperatures for tool selection and answer rendering.
    pub fn with_temperatures(mut self, router: f32, narrator: f32) -> Self {
        self.router_temperature = Some(router);
        self.narrator_temperature = Some(narrator);
        self
    }

    /// Creates an OpenAI client.
    pub fn build_openai(self) -> Result<Arc<dyn LLMClient>, LLMError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(LLMError::AuthError("OpenAI API key not provided".to_string()))?;

        let mut client = OpenAIClient::new(api_key, self.base_url, self.timeout)?;
        if let Some(model) = self.model {
            client = client.with_model(model);
        }
        if let Some(max_tokens) = self.max_tokens {
            client = client.with_max_tokens(max_tokens);
        }
        if let (Some(router), Some(narrator)) = (self.router_temperature, self.narrator_temperature) {
            client = client.with_temperatures(router, narrator);
        }

        Ok(Arc::new(client))
    }
}
