//! Error types for the medcalc_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medcalc_core operations
///
/// The profile store and the synchronization hook never fail; these errors
/// come from configuration, lookups by name, and the command-line shell.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A name that is not one of the shared profile fields
    #[error("Unknown shared field: {0}")]
    UnknownField(String),

    /// No calculator registered under this id
    #[error("Unknown calculator: {0}")]
    UnknownCalculator(String),

    /// No mounted calculator instance with this id
    #[error("Unknown calculator instance: {0}")]
    UnknownInstance(String),

    /// Calculator table validation error
    #[error("Registry validation error: {0}")]
    Registry(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
