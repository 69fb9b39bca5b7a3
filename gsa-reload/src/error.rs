//! Error types for the gsa-reload crate.

use std::error::Error as StdError;

/// A load function's deferred result failed.
///
/// The controller does not interpret the payload; it is logged and dropped.
#[derive(Debug, thiserror::Error)]
#[error("Load failed: {source}")]
pub struct LoadError {
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl LoadError {
    /// Wrap an error produced by the transport or client layer
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self {
            source: error.into(),
        }
    }

    /// Build a load error from a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }

    /// The wrapped error
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Errors reported while building a controller.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The diagnostic name is empty
    #[error("Reload controller requires a non-empty name")]
    MissingName,

    /// No reload function was supplied
    #[error("Reload controller {name:?} has no reload function")]
    MissingReload {
        /// The controller name
        name: String,
    },

    /// Timers need a tokio runtime and none is reachable from this thread
    #[error("Reload controller {name:?} must be built inside a tokio runtime")]
    NoRuntime {
        /// The controller name
        name: String,
    },
}

/// Convenience type alias for Results using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let error = LoadError::msg("connection refused");
        assert_eq!(error.to_string(), "Load failed: connection refused");
        assert_eq!(error.inner().to_string(), "connection refused");
    }

    #[test]
    fn test_load_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "gmp timed out");
        let error = LoadError::new(io);

        let source = error.source().expect("source should be set");
        assert_eq!(source.to_string(), "gmp timed out");
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::MissingName.to_string(),
            "Reload controller requires a non-empty name"
        );

        let error = ConfigError::MissingReload {
            name: "tasks".to_string(),
        };
        assert_eq!(error.to_string(), "Reload controller \"tasks\" has no reload function");

        let error = ConfigError::NoRuntime {
            name: "tasks".to_string(),
        };
        assert!(error.to_string().contains("tokio runtime"));
    }
}
