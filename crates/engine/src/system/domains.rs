//! Domains and the DNS zone they are expected to publish

use crate::diagnosis::cache::ReportCache;
use crate::diagnosis::checks::ip_meta;
use hostward_config::DomainsConfig;
use hostward_core::{DnsConfig, DomainDirectory, Error, ExpectedRecord, IpVersion, Result};
use std::fs;
use std::path::PathBuf;

const DEFAULT_TTL: u32 = 3600;

/// Domains from the configuration file
///
/// Address records are derived from the public IPs the last `ip`
/// diagnosis observed, so the zone follows the server as it moves.
#[derive(Debug, Clone)]
pub struct ConfigDomainDirectory {
    domains: DomainsConfig,
    cache: ReportCache,
    dkim_dir: PathBuf,
}

impl ConfigDomainDirectory {
    pub fn new(domains: DomainsConfig, cache: ReportCache, dkim_dir: impl Into<PathBuf>) -> Self {
        Self {
            domains,
            cache,
            dkim_dir: dkim_dir.into(),
        }
    }

    fn public_ip(&self, version: IpVersion) -> Option<String> {
        match self.cache.find("ip", &ip_meta(version)) {
            Ok(finding) => finding.and_then(|f| f.data_str("global").map(ToString::to_string)),
            Err(e) => {
                tracing::warn!("Could not read cached ip report: {}", e);
                None
            }
        }
    }

    /// DKIM public key published as `mail._domainkey`
    ///
    /// The key file holds a zone snippet such as
    /// `mail._domainkey IN TXT ( "v=DKIM1; k=rsa; " "p=..." )`.
    fn dkim_record(&self, domain: &str) -> Option<String> {
        let content = fs::read_to_string(self.dkim_dir.join(format!("{domain}.mail.txt"))).ok()?;
        let parts: Vec<&str> = content
            .split('"')
            .skip(1)
            .step_by(2)
            .filter(|part| !part.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| format!("\"{}\"", parts.concat()))
    }

    fn address_records(
        name: &str,
        ipv4: Option<&String>,
        ipv6: Option<&String>,
        include_empty_aaaa: bool,
    ) -> Vec<ExpectedRecord> {
        let mut records = Vec::new();
        if let Some(ipv4) = ipv4 {
            records.push(ExpectedRecord::new(name, DEFAULT_TTL, "A", Some(ipv4.clone())));
        }
        match ipv6 {
            Some(ipv6) => {
                records.push(ExpectedRecord::new(name, DEFAULT_TTL, "AAAA", Some(ipv6.clone())));
            }
            None if include_empty_aaaa => {
                records.push(ExpectedRecord::new(name, DEFAULT_TTL, "AAAA", None));
            }
            None => {}
        }
        records
    }
}

impl DomainDirectory for ConfigDomainDirectory {
    fn list_domains(&self) -> Result<Vec<String>> {
        Ok(self.domains.all())
    }

    fn main_domain(&self) -> Result<String> {
        self.domains
            .main_domain()
            .ok_or_else(|| Error::Config("No main domain configured".to_string()))
    }

    fn expected_dns_config(&self, domain: &str, include_empty_aaaa: bool) -> Result<DnsConfig> {
        let ipv4 = self.public_ip(IpVersion::V4);
        let ipv6 = self.public_ip(IpVersion::V6);
        let target = format!("{domain}.");

        let basic = Self::address_records("@", ipv4.as_ref(), ipv6.as_ref(), include_empty_aaaa);

        let mut mail = vec![
            ExpectedRecord::new("@", DEFAULT_TTL, "MX", Some(format!("10 {target}"))),
            ExpectedRecord::new(
                "@",
                DEFAULT_TTL,
                "TXT",
                Some("\"v=spf1 a mx -all\"".to_string()),
            ),
        ];
        if let Some(dkim) = self.dkim_record(domain) {
            mail.push(ExpectedRecord::new("mail._domainkey", DEFAULT_TTL, "TXT", Some(dkim)));
            mail.push(ExpectedRecord::new(
                "_dmarc",
                DEFAULT_TTL,
                "TXT",
                Some("\"v=DMARC1; p=none\"".to_string()),
            ));
        }

        let mut xmpp = vec![
            ExpectedRecord::new(
                "_xmpp-client._tcp",
                DEFAULT_TTL,
                "SRV",
                Some(format!("0 5 5222 {target}")),
            ),
            ExpectedRecord::new(
                "_xmpp-server._tcp",
                DEFAULT_TTL,
                "SRV",
                Some(format!("0 5 5269 {target}")),
            ),
        ];
        for name in ["muc", "pubsub", "vjud", "xmpp-upload"] {
            xmpp.push(ExpectedRecord::new(name, DEFAULT_TTL, "CNAME", Some("@".to_string())));
        }

        let mut extra = Self::address_records("*", ipv4.as_ref(), ipv6.as_ref(), include_empty_aaaa);
        extra.push(ExpectedRecord::new(
            "@",
            DEFAULT_TTL,
            "CAA",
            Some("128 issue \"letsencrypt.org\"".to_string()),
        ));

        let mut config = DnsConfig::new();
        config.insert("basic".to_string(), basic);
        config.insert("mail".to_string(), mail);
        config.insert("xmpp".to_string(), xmpp);
        config.insert("extra".to_string(), extra);
        Ok(config)
    }
}
