use clap::Parser;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use weather_agent::repl::{self, LineReader, ReplError};
use weather_agent::weather::{InMemoryStore, register_weather_tools};
use weather_agent::{Agent, AgentConfig, AppConfig, AppError, Cli, LLMClientBuilder, ToolRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(cli).await?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::from_cli(cli)?;
    config.validate()?;

    let store = Arc::new(InMemoryStore::load(&config.data_file)?);
    let mut registry = ToolRegistry::new();
    register_weather_tools(&mut registry, store);

    let llm_client = LLMClientBuilder::new()
        .with_api_key(config.api_key.clone())
        .with_base_url(config.base_url.clone())
        .with_model(config.model.clone())
        .with_timeout(config.timeout)
        .with_max_tokens(config.max_tokens)
        .with_temperatures(config.router_temperature, config.narrator_temperature)
        .build_openai()?;

    let agent = Agent::new(
        llm_client,
        Arc::new(registry),
        AgentConfig {
            system_prompt: config.system_prompt.clone(),
        },
    );
    info!(model = %config.model, tools = agent.tool_names().len(), "Agent ready");

    let interrupt = repl::interrupt_signal()?;

    println!("[{}] running with tools: {:?}", config.server_name, agent.tool_names());
    println!("Waiting for input...");

    let input = LineReader::spawn(|| DefaultEditor::new().map_err(ReplError::from));
    repl::run(&agent, input, interrupt, &mut std::io::stdout()).await?;
    Ok(())
}
