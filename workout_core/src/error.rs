//! Error types for the workout_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
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

    /// The session definition could not be loaded (not found, unreadable, empty)
    #[error("Failed to load workout definition: {0}")]
    DefinitionLoad(String),

    /// A command was issued that the current session state does not accept
    #[error("Command '{command}' is not valid while the session is {state}")]
    InvalidCommand {
        command: &'static str,
        state: String,
    },

    /// Wake lock could not be acquired or released
    #[error("Wake lock error: {0}")]
    WakeLock(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
