pub mod client;
pub mod openai;

pub use client::{LLMClient, LLMClientBuilder, LLMError, StructuredReply};
pub use openai::OpenAIClient;
