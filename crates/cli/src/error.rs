//! Error types for CLI commands
//!
//! Structured errors for the outcomes the CLI reports specially; anything
//! else travels as `anyhow::Error` through the `Other` variant.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Some diagnosis categories could not run
    #[error("Diagnosis failed for {failed} out of {total} categories")]
    DiagnosisFailed {
        /// Number of categories that failed
        failed: usize,
        /// Number of categories requested
        total: usize,
    },

    /// A hook exited with a non-zero code
    #[error("Hook {} exited with code {code}", path.display())]
    HookFailed {
        /// The hook script
        path: PathBuf,
        /// Its exit code
        code: i32,
    },

    /// Some hooks of a callback failed
    #[error("{failed} hook(s) failed for action '{action}'")]
    CallbackFailed {
        /// The action
        action: String,
        /// Number of failed hooks
        failed: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<hostward_core::Error> for CommandError {
    fn from(err: hostward_core::Error) -> Self {
        Self::Other(err.into())
    }
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    /// Create a `ConfigError` from any error type
    pub fn config<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::ConfigError(Box::new(err))
    }
}
