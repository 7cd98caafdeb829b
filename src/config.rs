//! # Configuration
//!
//! Settings come from command-line flags, then environment variables (a
//! `.env` file is loaded into the environment first by the binary), then
//! built-in defaults.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::agent::prompt::DEFAULT_SYSTEM_PROMPT;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_DATA_FILE: &str = "sample_weatherdata.json";
const DEFAULT_SERVER_NAME: &str = "WeatherMCP";

/// Command-line arguments.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "Ask questions about historical weather observations")]
pub struct Cli {
    /// API key for the chat-completions endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Model used for both tool selection and answer rendering
    #[arg(short, long, env = "WEATHER_AGENT_MODEL")]
    pub model: Option<String>,

    /// JSON or JSON-lines export of the observation collection
    #[arg(short, long, env = "WEATHER_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// File whose contents replace the built-in system prompt
    #[arg(long)]
    pub system_prompt_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OpenAI API key not provided (set OPENAI_API_KEY or pass --api-key)")]
    MissingApiKey,
    #[error("data file not found: {0}")]
    MissingDataFile(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Fully resolved application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub router_temperature: f32,
    pub narrator_temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub data_file: PathBuf,
    pub system_prompt: String,
    pub server_name: String,
}

impl AppConfig {
    /// Resolves settings from parsed arguments.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_key = cli
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let system_prompt = match cli.system_prompt_file {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read { path, source })?
                .trim()
                .to_string(),
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        if cli.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            api_key,
            base_url: cli.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: cli.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            router_temperature: 0.1,
            narrator_temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(cli.timeout_secs),
            data_file: cli
                .data_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            system_prompt,
            server_name: DEFAULT_SERVER_NAME.to_string(),
        })
    }

    /// Checks settings that depend on the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.data_file.is_file() {
            return Err(ConfigError::MissingDataFile(self.data_file.clone()));
        }
        if self.system_prompt.is_empty() {
            return Err(ConfigError::Invalid {
                field: "system_prompt",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli() -> Cli {
        Cli {
            api_key: Some("sk-test".into()),
            timeout_secs: 60,
            ..Cli::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_cli(cli()).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.data_file, PathBuf::from("sample_weatherdata.json"));
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_or_blank_api_key() {
        let err = AppConfig::from_cli(Cli { api_key: None, ..cli() }).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let err = AppConfig::from_cli(Cli { api_key: Some("  ".into()), ..cli() }).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn test_system_prompt_file_and_data_file() {
        let mut prompt = tempfile::NamedTempFile::new().unwrap();
        writeln!(prompt, "You answer questions about buoys.").unwrap();
        let data = tempfile::NamedTempFile::new().unwrap();

        let config = AppConfig::from_cli(Cli {
            system_prompt_file: Some(prompt.path().to_path_buf()),
            data_file: Some(data.path().to_path_buf()),
            ..cli()
        })
        .unwrap();

        assert_eq!(config.system_prompt, "You answer questions about buoys.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_data_file() {
        let config = AppConfig::from_cli(Cli {
            data_file: Some(PathBuf::from("/nonexistent/observations.json")),
            ..cli()
        })
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingDataFile(_))));
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Cli::try_parse_from([
            "weather-agent",
            "--api-key",
            "sk-flag",
            "--model",
            "gpt-4o-mini",
            "--data-file",
            "obs.json",
            "--timeout-secs",
            "5",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("sk-flag"));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(cli.timeout_secs, 5);
        assert!(cli.verbose);

        let err = AppConfig::from_cli(Cli { timeout_secs: 0, ..cli }).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "timeout_secs", .. }));
    }
}
