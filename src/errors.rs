use thiserror::Error;
use worksbill_config::ConfigError;
use worksbill_core::CoreError;

/// Unified error type for the engine, configuration and persistence layers.
#[derive(Debug, Error)]
pub enum WorksbillError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, WorksbillError>;

/// User-facing CLI error wrapper.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] WorksbillError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for WorksbillError {
    fn from(err: std::io::Error) -> Self {
        WorksbillError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for WorksbillError {
    fn from(err: serde_json::Error) -> Self {
        WorksbillError::Storage(err.to_string())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::from(WorksbillError::from(err))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::from(WorksbillError::from(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Command(err.to_string())
    }
}
