//! Error types for the weather-agent library.

use std::any::Any;
use thiserror::Error;

/// Errors that stop the application before or outside a turn.
///
/// Failures inside a turn never surface here; they are rendered for the user.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be assembled
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// LLM client could not be built
    #[error("LLM error: {0}")]
    LLM(#[from] crate::llm::LLMError),

    /// Observation data could not be loaded
    #[error("Store error: {0}")]
    Store(#[from] crate::weather::StoreError),

    /// The interactive prompt failed
    #[error("REPL error: {0}")]
    Repl(#[from] crate::repl::ReplError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts the message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
