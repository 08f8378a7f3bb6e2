//! Collaborator interfaces consumed by the diagnosis engine
//!
//! The engine never talks to LDAP, systemd, DNS servers or remote services
//! directly. It depends on these traits instead, which keeps the category
//! checks testable with in-memory fakes and lets the CLI plug in the real
//! implementations from `hostward_engine::system`.

use crate::Result;
use crate::net::IpVersion;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One DNS record a domain is expected to carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRecord {
    /// Record name relative to the domain (`@` for the apex)
    pub name: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record type (`A`, `AAAA`, `MX`, `TXT`, ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Expected value; `None` means the record should not exist
    pub value: Option<String>,
}

impl ExpectedRecord {
    /// Create an expected record
    pub fn new(name: &str, ttl: u32, record_type: &str, value: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            record_type: record_type.to_string(),
            value,
        }
    }
}

/// Expected records grouped by category (`basic`, `mail`, `xmpp`, `extra`, ...)
pub type DnsConfig = IndexMap<String, Vec<ExpectedRecord>>;

/// Domain storage interface
pub trait DomainDirectory {
    /// All domains known to the server
    fn list_domains(&self) -> Result<Vec<String>>;

    /// The main (apex) domain
    fn main_domain(&self) -> Result<String>;

    /// Build the expected DNS configuration of a domain
    ///
    /// With `include_empty_aaaa`, an `AAAA` record with no value is listed
    /// when the server has no global IPv6, so that diagnosis can tell a
    /// missing AAAA from a wrong one.
    fn expected_dns_config(&self, domain: &str, include_empty_aaaa: bool) -> Result<DnsConfig>;
}

/// Description of a managed service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Ports that must be reachable from the outside
    #[serde(default)]
    pub needs_exposed_ports: Vec<u16>,
    /// Free-form category used for operator attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Custom shell command deciding whether the service runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_status: Option<String>,
    /// Shell command validating the service configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_conf: Option<String>,
}

/// Runtime status of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// `running`, `inactive`, `failed` or `unknown`
    pub status: String,
    /// `valid`, `broken` or `unknown`
    pub configuration: String,
    /// Output of the failed configuration check
    #[serde(default)]
    pub configuration_details: Vec<String>,
}

/// Service registry interface
pub trait ServiceRegistry {
    /// All managed services keyed by name
    fn list_services(&self) -> Result<IndexMap<String, ServiceInfo>>;

    /// Query the status of one service
    fn status(&self, name: &str, info: &ServiceInfo) -> Result<ServiceStatus>;
}

/// Which resolvers a DNS query goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverPolicy {
    /// The system resolver
    Local,
    /// Public resolvers only, bypassing any local cache or override
    ForceExternal,
}

/// Outcome class of a DNS query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsStatus {
    /// At least one answer
    Ok,
    /// The name does not exist
    NxDomain,
    /// The name exists but has no record of that type
    NoAnswer,
    /// No resolver answered in time
    Timeout,
    /// Anything else
    Error,
}

/// Result of a DNS query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    /// Outcome class
    pub status: DnsStatus,
    /// Answer values in the order given by the resolver
    pub answers: Vec<String>,
}

impl DnsAnswer {
    /// A successful answer
    pub fn ok(answers: Vec<String>) -> Self {
        Self {
            status: DnsStatus::Ok,
            answers,
        }
    }

    /// A failed answer without values
    pub fn failed(status: DnsStatus) -> Self {
        Self {
            status,
            answers: Vec::new(),
        }
    }

    /// Whether the query succeeded
    pub fn is_ok(&self) -> bool {
        self.status == DnsStatus::Ok
    }
}

/// DNS query primitive
pub trait DnsResolver {
    /// Resolve `query` for `record_type`; failures are reported through the status
    fn dig(&self, query: &str, record_type: &str, policy: ResolverPolicy) -> DnsAnswer;
}

/// Registrar lookup interface
pub trait Whois {
    /// Raw registrar answer for a domain
    fn lookup(&self, domain: &str) -> Result<String>;
}

/// Installed package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    /// Version string
    pub version: String,
    /// Repository (distribution component) it comes from
    pub repo: String,
}

/// Local system facts
pub trait SystemProbe {
    /// Virtualization technology, `bare-metal` when none
    fn virtualization(&self) -> Result<String>;

    /// CPU architecture as reported by the package manager
    fn architecture(&self) -> Result<String>;

    /// Board model for single-board computers
    fn board_model(&self) -> Option<String>;

    /// Running kernel release
    fn kernel_version(&self) -> Result<String>;

    /// Distribution release
    fn distribution_version(&self) -> Result<String>;

    /// Versions of the tracked packages, keyed by package name
    fn package_versions(&self) -> Result<IndexMap<String, PackageVersion>>;
}

/// Outcome of a best-effort HTTP probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered (any status code)
    Reached,
    /// The request timed out
    TimedOut,
    /// Any other transport failure
    Failed(String),
}

/// Local network facts and probes
pub trait NetworkProbe {
    /// Whether outgoing connectivity works for this IP version
    fn can_reach_internet(&self, version: IpVersion) -> bool;

    /// The address the outside world sees for this IP version
    fn public_ip(&self, version: IpVersion) -> Result<Option<String>>;

    /// The address of the local interface used for this IP version
    fn local_ip(&self, version: IpVersion) -> Option<String>;

    /// Whether the system resolver can resolve a well-known name
    fn can_resolve(&self) -> bool;

    /// Issue a HEAD request with a short timeout
    fn head(&self, url: &str, timeout: Duration) -> ProbeOutcome;

    /// Whether a TCP connection to `host:port` can be opened
    fn tcp_connect(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

/// Remote diagnosis oracle, checking the server from outside its network
pub trait RemoteOracle {
    /// POST `body` to `endpoint`, forcing the connection over `version`
    fn post(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        version: IpVersion,
    ) -> Result<serde_json::Value>;
}

/// Paste-sharing service
pub trait PasteService {
    /// Upload text and return a public URL
    fn upload(&self, content: &str) -> Result<String>;
}

/// Local mail delivery
pub trait Mailer {
    /// Send a plain text message
    fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Message catalog lookup
pub trait Translator {
    /// Render `key` with named arguments; unknown keys render as the key itself
    fn translate(&self, key: &str, args: &IndexMap<String, serde_json::Value>) -> String;

    /// Whether the catalog knows `key`
    fn has_key(&self, key: &str) -> bool;
}
