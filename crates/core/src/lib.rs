//! Core types and utilities for hostward
//!
//! This is the foundation crate (Layer 0) that all other hostward crates depend on.
//! It provides:
//! - Base error types
//! - Shell quoting for generated command lines
//! - The `IpVersion` type
//! - Collaborator traits (domains, services, DNS, oracle, ...)
//!
//! This crate has no dependencies on other hostward crates.

pub mod error;
pub mod net;
pub mod shell;
pub mod traits;

pub use error::{Error, Result};
pub use net::IpVersion;
pub use traits::{
    DnsAnswer, DnsConfig, DnsResolver, DnsStatus, DomainDirectory, ExpectedRecord, Mailer,
    NetworkProbe, PackageVersion, PasteService, ProbeOutcome, RemoteOracle, ResolverPolicy,
    ServiceInfo, ServiceRegistry, ServiceStatus, SystemProbe, Translator, Whois,
};
