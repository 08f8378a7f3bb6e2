//! Base error types for hostward
//!
//! This module provides the foundation error types that all crates can use.

use std::path::PathBuf;
use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file that was expected to exist does not
    #[error("File does not exist: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Hook configuration error
    #[error("Hook configuration error: {0}")]
    HookConfig(String),

    /// No hook registered under this name
    #[error("Unknown hook name: {name}")]
    HookNameUnknown { name: String },

    /// Hook execution error
    #[error("Hook execution error: {0}")]
    HookExecution(String),

    /// The hook process ended without an exit code (killed by a signal)
    #[error("Hook {} did not terminate properly", path.display())]
    HookNotTerminated { path: PathBuf },

    /// The hook exited with a non-zero code
    #[error("Hook {} failed with exit code {code}", path.display())]
    HookFailed { path: PathBuf, code: i32 },

    /// The structured return written by a hook could not be parsed
    #[error("Failed to parse return of hook {}: {message}\nRaw content: {raw_content}", path.display())]
    HookReturn {
        path: PathBuf,
        message: String,
        raw_content: String,
    },

    /// An embedded module broke the `(exit code, mapping)` contract
    #[error("Module {module} did not return a (code, mapping) pair: {message}")]
    ModuleContract { module: String, message: String },

    /// Requested diagnosis categories do not exist
    #[error("Unknown diagnosis categories: {0}")]
    UnknownCategories(String),

    /// Malformed ignore filter or lookup criteria
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Diagnosis cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Remote diagnosis oracle error
    #[error("Remote diagnosis failed: {0}")]
    Oracle(String),

    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
