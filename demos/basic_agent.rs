//! # Basic Agent Example
//!
//! Loads an observation export, registers the weather tools and answers a
//! single question without the interactive loop.
//!
//! ## Usage
//!
//! ```bash
//! export OPENAI_API_KEY="your-api-key"
//! cargo run --example basic_agent -- sample_weatherdata.json "how many records for PLAT"
//! ```

use std::sync::Arc;
use weather_agent::prelude::*;
use weather_agent::weather::{InMemoryStore, register_weather_tools};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let data_file = args.next().unwrap_or_else(|| "sample_weatherdata.json".to_string());
    let question = args
        .next()
        .unwrap_or_else(|| "Which stations have the most observations?".to_string());

    // Create OpenAI client
    let mut builder = LLMClientBuilder::new().with_api_key(std::env::var("OPENAI_API_KEY")?);
    if let Ok(url) = std::env::var("OPENAI_API_BASE_URL") {
        builder = builder.with_base_url(url);
    }
    let llm_client = builder.build_openai()?;

    // Register tools over the loaded observations
    let store = Arc::new(InMemoryStore::load(&data_file)?);
    let mut registry = ToolRegistry::new();
    register_weather_tools(&mut registry, store);
    println!("Tools: {:?}", registry.list_names());

    let agent = Agent::new(llm_client, Arc::new(registry), AgentConfig::default());

    println!("Question: {}", question);
    println!("Answer: {}", agent.handle_turn(&question).await);

    Ok(())
}
