//! Error types for the gsa-settings crate.

use std::path::PathBuf;

/// Errors that can occur while loading reload settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        /// Path of the file that failed
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid JSON or has the wrong shape
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override holds something other than a millisecond count
    #[error("Invalid value for {key}: {value:?} (expected milliseconds)")]
    InvalidEnv {
        /// The environment variable name
        key: String,
        /// The rejected value
        value: String,
    },
}

/// Convenience type alias for Results using SettingsError.
pub type Result<T> = std::result::Result<T, SettingsError>;
