//! Shared traits and status presentation vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for entities stored in a project book.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Visual weight a status carries when rendered by a client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StatusTone {
    Neutral,
    Pending,
    Positive,
    Negative,
    Attention,
}

impl StatusTone {
    /// Conventional colour name for the tone.
    pub fn color(self) -> &'static str {
        match self {
            StatusTone::Neutral => "gray",
            StatusTone::Pending => "blue",
            StatusTone::Positive => "green",
            StatusTone::Negative => "red",
            StatusTone::Attention => "yellow",
        }
    }
}

impl fmt::Display for StatusTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.color())
    }
}

/// Total mapping from a closed status enum to its label and tone.
pub trait StatusVocabulary: Copy {
    fn label(self) -> &'static str;
    fn tone(self) -> StatusTone;
}

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use chrono;
pub use rust_decimal;
pub use serde;
pub use uuid;
