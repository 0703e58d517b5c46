use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Configuration backup `{0}` not found")]
    BackupNotFound(String),
}
