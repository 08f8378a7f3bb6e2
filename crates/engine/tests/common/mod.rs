//! In-memory collaborators for diagnosis tests
#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use hostward_config::IgnoreFilterStore;
use hostward_core::{
    DnsAnswer, DnsConfig, DnsResolver, DnsStatus, DomainDirectory, Error, ExpectedRecord,
    IpVersion, Mailer, NetworkProbe, PackageVersion, PasteService, ProbeOutcome, RemoteOracle,
    ResolverPolicy, Result, ServiceInfo, ServiceRegistry, ServiceStatus, SystemProbe, Whois,
};
use hostward_engine::diagnosis::{
    Catalog, CheckSettings, DiagnosisContext, Finding, Report, ReportCache, Status,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const MAIN_DOMAIN: &str = "example.org";
pub const PUBLIC_IPV4: &str = "203.0.113.7";
pub const PUBLIC_IPV6: &str = "2001:db8::7";

#[derive(Debug, Clone)]
pub struct FakeDomains {
    pub main: String,
    pub list: Vec<String>,
    pub expected: DnsConfig,
}

impl Default for FakeDomains {
    fn default() -> Self {
        let mut expected = DnsConfig::new();
        expected.insert(
            "basic".into(),
            vec![
                ExpectedRecord::new("@", 3600, "A", Some(PUBLIC_IPV4.into())),
                ExpectedRecord::new("@", 3600, "AAAA", None),
            ],
        );
        expected.insert(
            "mail".into(),
            vec![
                ExpectedRecord::new("@", 3600, "MX", Some(format!("10 {MAIN_DOMAIN}."))),
                ExpectedRecord::new("@", 3600, "TXT", Some("\"v=spf1 a mx -all\"".into())),
            ],
        );
        expected.insert("xmpp".into(), Vec::new());
        expected.insert("extra".into(), Vec::new());

        Self {
            main: MAIN_DOMAIN.into(),
            list: vec![MAIN_DOMAIN.into()],
            expected,
        }
    }
}

impl DomainDirectory for FakeDomains {
    fn list_domains(&self) -> Result<Vec<String>> {
        Ok(self.list.clone())
    }

    fn main_domain(&self) -> Result<String> {
        Ok(self.main.clone())
    }

    fn expected_dns_config(&self, _domain: &str, include_empty_aaaa: bool) -> Result<DnsConfig> {
        let mut config = self.expected.clone();
        if !include_empty_aaaa {
            for records in config.values_mut() {
                records.retain(|r| r.value.is_some());
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeServices {
    pub services: IndexMap<String, ServiceInfo>,
    pub statuses: IndexMap<String, ServiceStatus>,
}

impl FakeServices {
    pub fn with(mut self, name: &str, ports: &[u16], status: &str, configuration: &str) -> Self {
        self.services.insert(
            name.into(),
            ServiceInfo {
                needs_exposed_ports: ports.to_vec(),
                ..ServiceInfo::default()
            },
        );
        self.statuses.insert(
            name.into(),
            ServiceStatus {
                status: status.into(),
                configuration: configuration.into(),
                configuration_details: Vec::new(),
            },
        );
        self
    }
}

impl ServiceRegistry for FakeServices {
    fn list_services(&self) -> Result<IndexMap<String, ServiceInfo>> {
        Ok(self.services.clone())
    }

    fn status(&self, name: &str, _info: &ServiceInfo) -> Result<ServiceStatus> {
        self.statuses
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Message(format!("no such service {name}")))
    }
}

/// Records keyed by `(query, type)`
#[derive(Debug, Clone, Default)]
pub struct FakeDns {
    pub records: HashMap<(String, String), Vec<String>>,
}

impl FakeDns {
    pub fn with(mut self, query: &str, record_type: &str, answers: &[&str]) -> Self {
        self.records.insert(
            (query.into(), record_type.into()),
            answers.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// A zone matching the default expected configuration
    pub fn healthy() -> Self {
        Self::default()
            .with(MAIN_DOMAIN, "A", &[PUBLIC_IPV4])
            .with(MAIN_DOMAIN, "MX", &["10 example.org."])
            .with(MAIN_DOMAIN, "TXT", &["\"v=spf1 a mx -all\""])
    }
}

impl DnsResolver for FakeDns {
    fn dig(&self, query: &str, record_type: &str, _policy: ResolverPolicy) -> DnsAnswer {
        match self.records.get(&(query.to_string(), record_type.to_string())) {
            Some(answers) => DnsAnswer::ok(answers.clone()),
            None => DnsAnswer::failed(DnsStatus::NoAnswer),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeWhois {
    pub output: String,
}

impl Whois for FakeWhois {
    fn lookup(&self, _domain: &str) -> Result<String> {
        Ok(self.output.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FakeSystem {
    pub packages: IndexMap<String, PackageVersion>,
}

impl Default for FakeSystem {
    fn default() -> Self {
        let mut packages = IndexMap::new();
        for (name, version) in [("hostward", "11.2.3"), ("hostward-admin", "11.2.1")] {
            packages.insert(
                name.to_string(),
                PackageVersion {
                    version: version.into(),
                    repo: "stable".into(),
                },
            );
        }
        Self { packages }
    }
}

impl SystemProbe for FakeSystem {
    fn virtualization(&self) -> Result<String> {
        Ok("kvm".into())
    }

    fn architecture(&self) -> Result<String> {
        Ok("amd64".into())
    }

    fn board_model(&self) -> Option<String> {
        None
    }

    fn kernel_version(&self) -> Result<String> {
        Ok("6.1.0-18-amd64".into())
    }

    fn distribution_version(&self) -> Result<String> {
        Ok("12.5".into())
    }

    fn package_versions(&self) -> Result<IndexMap<String, PackageVersion>> {
        Ok(self.packages.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FakeNetwork {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub resolves: bool,
    pub hairpin: ProbeOutcome,
    pub smtp_out: bool,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self {
            ipv4: Some(PUBLIC_IPV4.into()),
            ipv6: None,
            resolves: true,
            hairpin: ProbeOutcome::Reached,
            smtp_out: true,
        }
    }
}

impl FakeNetwork {
    fn public(&self, version: IpVersion) -> Option<&String> {
        match version {
            IpVersion::V4 => self.ipv4.as_ref(),
            IpVersion::V6 => self.ipv6.as_ref(),
        }
    }
}

impl NetworkProbe for FakeNetwork {
    fn can_reach_internet(&self, version: IpVersion) -> bool {
        self.public(version).is_some()
    }

    fn public_ip(&self, version: IpVersion) -> Result<Option<String>> {
        Ok(self.public(version).cloned())
    }

    fn local_ip(&self, version: IpVersion) -> Option<String> {
        self.public(version).map(|_| match version {
            IpVersion::V4 => "192.168.1.10".to_string(),
            IpVersion::V6 => "fe80::10".to_string(),
        })
    }

    fn can_resolve(&self) -> bool {
        self.resolves
    }

    fn head(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
        self.hairpin.clone()
    }

    fn tcp_connect(&self, _host: &str, port: u16, _timeout: Duration) -> bool {
        port == 25 && self.smtp_out
    }
}

/// Canned answers keyed by `(endpoint, version)`; anything else fails
#[derive(Debug, Clone, Default)]
pub struct FakeOracle {
    pub answers: HashMap<(String, IpVersion), Value>,
}

impl FakeOracle {
    pub fn with(mut self, endpoint: &str, version: IpVersion, answer: Value) -> Self {
        self.answers.insert((endpoint.into(), version), answer);
        self
    }
}

impl RemoteOracle for FakeOracle {
    fn post(&self, endpoint: &str, _payload: &Value, ipversion: IpVersion) -> Result<Value> {
        self.answers
            .get(&(endpoint.to_string(), ipversion))
            .cloned()
            .ok_or_else(|| Error::Oracle(format!("{endpoint} unreachable over IPv{ipversion}")))
    }
}

#[derive(Debug, Default)]
pub struct FakePaste {
    pub uploads: RefCell<Vec<String>>,
}

impl PasteService for FakePaste {
    fn upload(&self, content: &str) -> Result<String> {
        self.uploads.borrow_mut().push(content.to_string());
        Ok("https://paste.example.net/raw/abcdef".into())
    }
}

#[derive(Debug, Default)]
pub struct SentMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct FakeMailer {
    pub sent: RefCell<Vec<SentMail>>,
}

impl Mailer for FakeMailer {
    fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.borrow_mut().push(SentMail {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        });
        Ok(())
    }
}

/// Collaborators a test context is built from
#[derive(Debug, Clone, Default)]
pub struct Fakes {
    pub domains: FakeDomains,
    pub services: FakeServices,
    pub dns: FakeDns,
    pub whois: FakeWhois,
    pub system: FakeSystem,
    pub network: FakeNetwork,
    pub oracle: FakeOracle,
}

/// A context rooted in `root` with the real English catalog
pub fn context(root: &Path, fakes: Fakes) -> DiagnosisContext {
    DiagnosisContext {
        cache: ReportCache::new(root.join("cache")),
        filters: IgnoreFilterStore::new(root.join("diagnosis.yml")),
        settings: CheckSettings {
            nginx_conf_dir: root.join("nginx"),
            well_known_dir: root.join("www/hostward-diagnosis"),
            oracle_host: "diagnosis.example.net".into(),
            hairpin_timeout: Duration::from_secs(1),
            core_package: "hostward".into(),
        },
        translator: Box::new(Catalog::english().unwrap()),
        domains: Box::new(fakes.domains),
        services: Box::new(fakes.services),
        dns: Box::new(fakes.dns),
        whois: Box::new(fakes.whois),
        system: Box::new(fakes.system),
        network: Box::new(fakes.network),
        oracle: Box::new(fakes.oracle),
    }
}

/// Cache an `ip` report with the given versions connected
pub fn cache_ip_report(ctx: &DiagnosisContext, versions: &[IpVersion]) {
    let mut items = Vec::new();
    for version in IpVersion::ALL {
        let connected = versions.contains(&version);
        let status = if connected {
            Status::Success
        } else if version == IpVersion::V4 {
            Status::Error
        } else {
            Status::Warning
        };
        let global = match (connected, version) {
            (true, IpVersion::V4) => Value::from(PUBLIC_IPV4),
            (true, IpVersion::V6) => Value::from(PUBLIC_IPV6),
            _ => Value::Null,
        };
        items.push(
            Finding::new(status, format!("diagnosis_ip_connected_ipv{version}"))
                .with_meta("test", format!("ipv{version}"))
                .with_data("global", global),
        );
    }
    ctx.cache.write(&Report::new("ip", 60, items)).unwrap();
}

/// Cache a `dnsrecords` report whose basic category shows an apex AAAA state
pub fn cache_dns_report(ctx: &DiagnosisContext, aaaa: &str) {
    let finding = Finding::new(Status::Success, "diagnosis_dns_good_conf")
        .with_meta("domain", MAIN_DOMAIN)
        .with_meta("category", "basic")
        .with_data("A:@", "OK")
        .with_data("AAAA:@", aaaa);
    ctx.cache
        .write(&Report::new("dnsrecords", 600, vec![finding]))
        .unwrap();
}

/// Write an up-to-date reverse-proxy configuration for `domain`
pub fn write_nginx_conf(ctx: &DiagnosisContext, domain: &str) {
    let dir = &ctx.settings.nginx_conf_dir;
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(format!("{domain}.conf")),
        "location ^~ '/.well-known/hostward-diagnosis/' {\n    default_type \"text/plain\";\n}\n",
    )
    .unwrap();
}

/// Install the built-in `.module` hooks under `<root>/hooks/diagnosis`
pub fn install_category_hooks(root: &Path) {
    let dir = root.join("hooks/diagnosis");
    fs::create_dir_all(&dir).unwrap();
    for (priority, id) in [
        ("00", "basesystem"),
        ("10", "ip"),
        ("12", "dnsrecords"),
        ("14", "ports"),
        ("21", "web"),
        ("24", "mail"),
        ("30", "services"),
    ] {
        fs::write(
            dir.join(format!("{priority}-{id}.module")),
            format!("diagnosis/{id}\n"),
        )
        .unwrap();
    }
}
