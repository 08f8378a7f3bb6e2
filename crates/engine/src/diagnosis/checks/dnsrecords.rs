//! Live DNS records against the expected configuration, and domain expiry

use super::expiration::{Expiration, ExpiryAlert, classify, parse_whois};
use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Message, Meta, Status};
use hostward_core::{ExpectedRecord, ResolverPolicy, Result};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::BTreeSet;

/// Suffixes whose records are managed by the dynamic DNS service
pub const DYNDNS_DOMAINS: &[&str] = &["nohost.me", "noho.st", "ynh.fr"];

/// Suffixes never looked up in whois
const NO_WHOIS_DOMAINS: &[&str] = &["netlib.re"];

/// Live value of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Current {
    Missing,
    Single(String),
    Multiple(Vec<String>),
}

impl Current {
    fn from_answers(mut answers: Vec<String>) -> Self {
        match answers.len() {
            0 => Self::Missing,
            1 => Self::Single(answers.remove(0)),
            _ => Self::Multiple(answers),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Missing => Value::Null,
            Self::Single(value) => Value::from(value.as_str()),
            Self::Multiple(values) => Value::from(values.clone()),
        }
    }
}

/// Classification of one expected record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordResult {
    Ok,
    Missing,
    Wrong,
}

impl RecordResult {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Missing => "MISSING",
            Self::Wrong => "WRONG",
        }
    }
}

fn txt_tokens(value: &str) -> BTreeSet<String> {
    value
        .trim_matches(|c| matches!(c, ';' | '"' | ' '))
        .replace(';', " ")
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

/// Whether a live value satisfies an expected record
///
/// `TXT` values compare as token sets; on the apex, `ip4:`/`ip6:` tokens are
/// disregarded on both sides. `MX` values compare by host only.
#[must_use]
pub fn record_matches(name: &str, record_type: &str, expected: Option<&str>, current: &Current) -> bool {
    let (expected, current) = match (expected, current) {
        (None, Current::Missing) => return true,
        (Some(_), Current::Missing) | (None, _) | (_, Current::Multiple(_)) => return false,
        (Some(expected), Current::Single(current)) => (expected, current.as_str()),
    };

    match record_type {
        "TXT" => {
            let mut expected = txt_tokens(expected);
            let mut current = txt_tokens(current);
            if name == "@" {
                let is_address = |t: &String| t.starts_with("ip4:") || t.starts_with("ip6:");
                expected.retain(|t| !is_address(t));
                current.retain(|t| !is_address(t));
            }
            expected == current
        }
        "MX" => expected.split_whitespace().last() == current.split_whitespace().last(),
        _ => expected == current,
    }
}

/// Whether `domain` is a direct subdomain of another known domain
fn is_subdomain(domain: &str, all: &[String]) -> bool {
    domain
        .split_once('.')
        .is_some_and(|(_, parent)| all.iter().any(|d| d == parent))
}

/// Whether `domain` is `suffix` itself or one of its subdomains
fn under_suffix(domain: &str, suffix: &str) -> bool {
    domain
        .strip_suffix(suffix)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
}

/// Registrable domains worth a whois lookup
fn registrable_domains(all: &[String]) -> IndexSet<String> {
    all.iter()
        .filter_map(|domain| psl::domain_str(domain))
        .filter(|domain| domain.contains('.'))
        .filter(|domain| {
            !DYNDNS_DOMAINS
                .iter()
                .chain(NO_WHOIS_DOMAINS)
                .any(|suffix| under_suffix(domain, suffix))
        })
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DnsRecords;

impl DnsRecords {
    fn current_record(ctx: &DiagnosisContext, domain: &str, record: &ExpectedRecord) -> Current {
        let query = if record.name == "@" {
            domain.to_string()
        } else {
            format!("{}.{domain}", record.name)
        };

        let answer = ctx
            .dns
            .dig(&query, &record.record_type, ResolverPolicy::ForceExternal);
        if answer.is_ok() {
            Current::from_answers(answer.answers)
        } else {
            Current::Missing
        }
    }

    fn check_domain(
        ctx: &DiagnosisContext,
        domain: &str,
        is_main: bool,
        is_subdomain: bool,
    ) -> Result<Vec<Finding>> {
        let mut expected = ctx.domains.expected_dns_config(domain, true)?;

        let categories: &[&str] = if is_subdomain {
            &["basic"]
        } else {
            &["basic", "mail", "xmpp", "extra"]
        };

        let mut findings = Vec::new();
        for category in categories {
            let records = expected.shift_remove(*category).unwrap_or_default();
            let mut results: IndexMap<String, RecordResult> = IndexMap::new();
            let mut discrepancies = Vec::new();

            for record in records {
                let id = format!("{}:{}", record.record_type, record.name);
                let current = Self::current_record(ctx, domain, &record);
                let value = match record.value.as_deref() {
                    Some("@") => Some(format!("{domain}.")),
                    other => other.map(ToString::to_string),
                };

                let result = if record_matches(&record.name, &record.record_type, value.as_deref(), &current) {
                    RecordResult::Ok
                } else if current == Current::Missing {
                    RecordResult::Missing
                } else {
                    RecordResult::Wrong
                };

                if result != RecordResult::Ok {
                    let key = if result == RecordResult::Missing {
                        "diagnosis_dns_missing_record"
                    } else {
                        "diagnosis_dns_discrepancy"
                    };
                    let mut args = Meta::new();
                    args.insert("type".into(), Value::from(record.record_type.as_str()));
                    args.insert("name".into(), Value::from(record.name.as_str()));
                    args.insert("value".into(), value.map_or(Value::Null, Value::from));
                    args.insert("current".into(), current.to_value());
                    args.insert("ttl".into(), Value::from(record.ttl));
                    discrepancies.push(Message::WithArgs(key.to_string(), args));
                }
                results.insert(id, result);
            }

            let important = (is_main && *category == "mail")
                || (*category == "basic"
                    && (results.get("A:@") != Some(&RecordResult::Ok)
                        || results.get("AAAA:@") == Some(&RecordResult::Wrong)));

            let mut finding = if discrepancies.is_empty() {
                Finding::new(Status::Success, "diagnosis_dns_good_conf")
            } else if important {
                Finding::new(Status::Error, "diagnosis_dns_bad_conf")
            } else {
                Finding::new(Status::Warning, "diagnosis_dns_bad_conf")
            };
            finding = finding.with_meta("domain", domain).with_meta("category", *category);
            for (id, result) in &results {
                finding = finding.with_data(id.as_str(), result.as_str());
            }

            if !discrepancies.is_empty() {
                let hint = if DYNDNS_DOMAINS.iter().any(|suffix| domain.ends_with(suffix)) {
                    "diagnosis_dns_try_dyndns_update_force"
                } else {
                    "diagnosis_dns_point_to_doc"
                };
                finding = finding.with_detail(hint).with_details(discrepancies);
            }

            findings.push(finding);
        }

        Ok(findings)
    }

    fn check_expiration(ctx: &DiagnosisContext, domains: &IndexSet<String>) -> Vec<Finding> {
        let now = chrono::Local::now().naive_local();
        let mut success = Vec::new();
        let mut warning = Vec::new();
        let mut error = Vec::new();
        let mut not_found = Vec::new();

        for domain in domains {
            let output = ctx.whois.lookup(domain).unwrap_or_else(|e| {
                tracing::debug!("whois lookup of {} failed: {}", domain, e);
                String::new()
            });
            let expiration = parse_whois(&output);

            if let Some(kind) = expiration.failure_kind() {
                let ns = ctx.dns.dig(domain, "NS", ResolverPolicy::ForceExternal);
                let a = ctx.dns.dig(domain, "A", ResolverPolicy::ForceExternal);
                if ns.is_ok() || a.is_ok() {
                    tracing::debug!("{} resolves, skipping its missing whois data", domain);
                } else {
                    not_found.push((
                        domain.clone(),
                        Message::with_args(
                            format!("diagnosis_domain_{kind}_details"),
                            [("domain", domain.as_str())],
                        ),
                    ));
                }
                continue;
            }

            let Expiration::Date(expires) = expiration else {
                continue;
            };
            let (alert, days) = classify(expires, now);
            let detail = Message::with_args(
                "diagnosis_domain_expires_in",
                [
                    ("domain", Value::from(domain.as_str())),
                    ("days", Value::from(days - 1)),
                    ("expire_date", Value::from(expires.format("%Y-%m-%d").to_string())),
                ],
            );
            let group = match alert {
                ExpiryAlert::Success => &mut success,
                ExpiryAlert::Warning => &mut warning,
                ExpiryAlert::Error => &mut error,
            };
            group.push((domain.clone(), detail));
        }

        let groups = [
            ("success", Status::Success, "domain_expiration", success),
            ("error", Status::Error, "domain_expiration", error),
            ("warning", Status::Warning, "domain_expiration", warning),
            ("not_found", Status::Warning, "domain_not_found", not_found),
        ];

        groups
            .into_iter()
            .filter(|(_, _, _, entries)| !entries.is_empty())
            .map(|(kind, status, test, entries)| {
                let mut finding = Finding::new(status, format!("diagnosis_domain_expiration_{kind}"))
                    .with_meta("test", test);
                // A single domain can then be ignored on its own
                if let [(domain, _)] = entries.as_slice() {
                    finding = finding.with_meta("domain", domain.as_str());
                }
                finding.with_details(entries.into_iter().map(|(_, detail)| detail))
            })
            .collect()
    }
}

impl Diagnoser for DnsRecords {
    fn id(&self) -> &'static str {
        "dnsrecords"
    }

    fn cache_duration(&self) -> u64 {
        600
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ip"]
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let main_domain = ctx.domains.main_domain()?;
        let all_domains = ctx.domains.list_domains()?;

        let mut findings = Vec::new();
        for domain in &all_domains {
            tracing::debug!("Diagnosing DNS conf for {}", domain);
            findings.extend(Self::check_domain(
                ctx,
                domain,
                *domain == main_domain,
                is_subdomain(domain, &all_domains),
            )?);
        }

        findings.extend(Self::check_expiration(ctx, &registrable_domains(&all_domains)));
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(value: &str) -> Current {
        Current::Single(value.to_string())
    }

    #[test]
    fn test_txt_token_sets() {
        assert!(record_matches(
            "mail._domainkey",
            "TXT",
            Some("\"v=DKIM1; k=rsa; p=KEY\""),
            &single("\"k=rsa; v=DKIM1; p=KEY;\"")
        ));
        assert!(!record_matches(
            "mail._domainkey",
            "TXT",
            Some("\"v=DKIM1; k=rsa; p=KEY\""),
            &single("\"v=DKIM1; k=rsa; p=OTHER\"")
        ));
    }

    #[test]
    fn test_spf_ignores_ip_tokens_on_apex() {
        let expected = Some("\"v=spf1 a mx -all\"");
        let current = single("\"v=spf1 a mx ip4:203.0.113.7 ip6:2001:db8::1 -all\"");

        assert!(record_matches("@", "TXT", expected, &current));
        assert!(!record_matches("sub", "TXT", expected, &current));
    }

    #[test]
    fn test_spf_ignores_ip_tokens_on_expected_side() {
        let expected = Some("\"v=spf1 a mx ip4:1.2.3.4 -all\"");

        assert!(record_matches("@", "TXT", expected, &single("\"v=spf1 a mx -all\"")));
        assert!(record_matches(
            "@",
            "TXT",
            expected,
            &single("\"v=spf1 a mx ip6:2001:db8::1 -all\"")
        ));
        assert!(!record_matches("@", "TXT", expected, &single("\"v=spf1 mx -all\"")));
        assert!(!record_matches("sub", "TXT", expected, &single("\"v=spf1 a mx -all\"")));
    }

    #[test]
    fn test_mx_ignores_priority() {
        assert!(record_matches("@", "MX", Some("10 example.org."), &single("20 example.org.")));
        assert!(!record_matches("@", "MX", Some("10 example.org."), &single("10 mx.other.org.")));
    }

    #[test]
    fn test_presence_rules() {
        assert!(!record_matches("@", "A", Some("203.0.113.7"), &Current::Missing));
        assert!(!record_matches("@", "AAAA", None, &single("2001:db8::1")));
        assert!(record_matches("@", "AAAA", None, &Current::Missing));
        assert!(!record_matches(
            "@",
            "A",
            Some("203.0.113.7"),
            &Current::Multiple(vec!["203.0.113.7".into(), "203.0.113.8".into()])
        ));
        assert!(record_matches("muc", "CNAME", Some("example.org."), &single("example.org.")));
    }

    #[test]
    fn test_subdomain_detection() {
        let all = vec!["example.org".to_string(), "blog.example.org".to_string(), "localhost".to_string()];
        assert!(is_subdomain("blog.example.org", &all));
        assert!(!is_subdomain("example.org", &all));
        assert!(!is_subdomain("localhost", &all));
    }

    #[test]
    fn test_registrable_domains() {
        let all = vec![
            "example.org".to_string(),
            "blog.example.org".to_string(),
            "me.nohost.me".to_string(),
            "shop.example.co.uk".to_string(),
        ];
        let domains: Vec<String> = registrable_domains(&all).into_iter().collect();
        assert_eq!(domains, vec!["example.org", "example.co.uk"]);
    }

    #[test]
    fn test_registrable_domains_skip_dyndns_and_no_whois() {
        let all = vec![
            "foo.me.nohost.me".to_string(),
            "bar.noho.st".to_string(),
            "ynh.fr".to_string(),
            "home.netlib.re".to_string(),
            "notnohost.me".to_string(),
        ];
        assert!(!under_suffix("notnohost.me", "nohost.me"));
        let domains: Vec<String> = registrable_domains(&all).into_iter().collect();
        assert_eq!(domains, vec!["notnohost.me"]);
    }
}
