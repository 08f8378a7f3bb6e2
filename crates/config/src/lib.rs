//! Configuration management for hostward
//!
//! This crate handles:
//! - Configuration loading and validation
//! - Fixed default locations
//! - The ignore-filter document
//! - Logging initialization

pub mod config;
pub mod dirs;
pub mod ignores;
pub mod logging;

// Re-export error types from core
pub use hostward_core::{Error, Result};

// Re-export main types
pub use config::{
    Config, DomainsConfig, OracleConfig, PackagesConfig, PathsConfig, ResolverConfig,
};
pub use ignores::{Criteria, DiagnosisSettings, IgnoreFilterStore, parse_criteria, parse_filter};
