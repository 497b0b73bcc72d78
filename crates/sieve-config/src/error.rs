//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or shape error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is neither `.toml` nor `.json`
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Values parsed but are inconsistent
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// A global subscriber was already installed
    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
