use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{LLMClient, LLMError, StructuredReply};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// System prompt for tool selection.
const ROUTER_PROMPT: &str = "You are a JSON API router. \
Your only job is to read the user query and return the correct tool name with arguments as a JSON object. \
Only return JSON. Never explain. Never include any text or comments. \
Respond strictly in this format: {\"tool\": \"tool_name\", \"args\": {\"param\": \"value\"}} \
IMPORTANT: For apply_leave function, use EXACT parameter names: employee_id, leave_type, start_date, end_date, reason \
If employee_id is not provided, ask user to provide it or use a placeholder like 'MISSING_EMP_ID'";

/// System prompt for rendering tool output as prose.
const NARRATOR_PROMPT: &str = "You are a helpful meteorological assistant. \
Your job is to explain weather data in clear, conversational language. \
Always provide natural, informative responses that are easy to understand. \
Don't include JSON or raw data in your responses - just natural language explanations.";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// An LLM client for OpenAI-compatible chat-completions APIs.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    router_temperature: f32,
    narrator_temperature: f32,
}

impl OpenAIClient {
    /// Creates a new OpenAI client.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LLMError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LLMError::AuthError(format!("invalid API key: {}", e)))?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut client_builder = reqwest::Client::builder().default_headers(headers);

        if let Some(timeout) = timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build()?;

        Ok(Self {
            client,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            router_temperature: 0.1,
            narrator_temperature: 0.7,
        })
    }

    /// Sets the model name sent with every request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperatures for the router and narrator prompts.
    pub fn with_temperatures(mut self, router: f32, narrator: f32) -> Self {
        self.router_temperature = router;
        self.narrator_temperature = narrator;
        self
    }

    /// Sends one system + user exchange and returns the trimmed reply text.
    async fn chat(&self, system: &str, prompt: &str, temperature: f32) -> Result<String, LLMError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt.trim(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature,
        };

        debug!(model = %self.model, temperature, "Sending request to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LLMError::AuthError(response_text),
                StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimitError(response_text),
                _ => LLMError::ApiError(format!("{}: {}", status, response_text)),
            });
        }

        debug!("LLM response: {}", response_text);

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| LLMError::InvalidResponse(format!("{}: {}", e, response_text)))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            LLMError::InvalidResponse(format!("No choices in response. Response: {}", response_text))
        })?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(LLMError::EmptyResponse),
        }
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn structured_choice(&self, prompt: &str) -> Result<StructuredReply, LLMError> {
        let text = self.chat(ROUTER_PROMPT, prompt, self.router_temperature).await?;
        Ok(StructuredReply::Text(text))
    }

    async fn free_text(&self, prompt: &str) -> Result<String, LLMError> {
        self.chat(NARRATOR_PROMPT, prompt, self.narrator_temperature).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("sk-test".into(), Some(format!("{}/", server.uri())), None)
            .unwrap()
            .with_model("gpt-4o-mini")
    }

    fn completion(content: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        }))
    }

    #[tokio::test]
    async fn test_structured_choice_trims_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.1
            })))
            .respond_with(completion(json!("  {\"tool\": \"get_wind_data\"}\n")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).structured_choice("which tool?").await.unwrap();
        assert_eq!(reply, StructuredReply::Text(r#"{"tool": "get_wind_data"}"#.into()));
    }

    #[tokio::test]
    async fn test_free_text_rejects_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(json!("   ")))
            .mount(&server)
            .await;

        let err = client(&server).free_text("describe").await.unwrap_err();
        assert!(matches!(err, LLMError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client(&server).free_text("describe").await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimitError(ref body) if body == "slow down"));
    }

    #[tokio::test]
    async fn test_missing_choices_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server).structured_choice("x").await.unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse(_)));
    }
}
