use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid state transition: cannot {action} {entity} in {from} state")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        action: String,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid calculation input: {0}")]
    InvalidCalculationInput(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl Display,
        action: impl Display,
    ) -> Self {
        CoreError::InvalidStateTransition {
            entity,
            from: from.to_string(),
            action: action.to_string(),
        }
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        CoreError::Storage(format!("{what} lock poisoned"))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, CoreError::InvalidStateTransition { .. })
    }
}
