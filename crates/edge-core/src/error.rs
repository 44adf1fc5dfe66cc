//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating coordinator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Debug level outside `0..=2`.
    #[error("debug level must be 0, 1 or 2, got {0}")]
    InvalidDebugLevel(u8),

    /// Semantically invalid configuration.
    #[error("invalid config: {0}")]
    Invalid(String),
}
