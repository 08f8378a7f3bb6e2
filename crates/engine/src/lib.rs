//! # Hostward Engine
//!
//! Hook execution and server diagnosis for hostward.
//!
//! - **Hooks**: discovery, execution and batch callbacks of action scripts
//! - **Diagnosis**: cached, dependency-aware category checks with ignore filters
//! - **System**: real implementations of the collaborator traits (DNS,
//!   whois, HTTP oracle, services, mail)

pub mod diagnosis;
pub mod hooks;
pub mod system;

// Re-export error types from core
pub use hostward_core::{Error, Result};
