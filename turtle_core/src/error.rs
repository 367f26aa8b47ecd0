//! Error types for the turtle_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for turtle_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mutation targeted the active workout while none exists
    #[error("No active workout")]
    NoActiveWorkout,

    /// Referenced workout exercise does not exist in the active workout
    #[error("Exercise {0} not found in the active workout")]
    ExerciseNotFound(Uuid),

    /// Referenced set does not exist in the given exercise
    #[error("Set {0} not found")]
    SetNotFound(Uuid),

    /// Input rejected by a policy check
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catalog or history lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by a stale reference into the active workout;
    /// callers should refresh their snapshot.
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, Error::ExerciseNotFound(_) | Error::SetNotFound(_))
    }
}
