//! HTTP reachability of every domain, and NAT hairpinning

use super::{available_ip_versions, ip_meta, ipv6_is_important};
use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Meta, Status};
use hostward_core::{IpVersion, ProbeOutcome, Result};
use indexmap::IndexMap;
use rand::Rng;
use serde_json::{Value, json};
use std::fs;

/// Location block every generated reverse-proxy configuration carries
pub const PROBE_LOCATION: &str = ".well-known/hostward-diagnosis/";

const NONCE_ALPHABET: &[u8] = b"0123456789abcdef";
const UNKNOWN_ERROR: &str = "error_http_check_unknown_error";

fn new_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| char::from(NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())]))
        .collect()
}

/// Oracle status key to message key
fn status_detail(status: &str) -> String {
    status.replace("error_http_check", "diagnosis_http")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Web;

impl Web {
    fn conf_is_up_to_date(ctx: &DiagnosisContext, domain: &str) -> bool {
        let path = ctx.settings.nginx_conf_dir.join(format!("{domain}.conf"));
        fs::read_to_string(path).is_ok_and(|conf| conf.contains(PROBE_LOCATION))
    }

    fn publish_nonce(ctx: &DiagnosisContext, nonce: &str) -> Result<()> {
        let dir = &ctx.settings.well_known_dir;
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;
        fs::write(dir.join(nonce), "")?;
        Ok(())
    }

    /// Returns the findings and whether a hairpinning test makes sense
    fn test_http(
        ctx: &DiagnosisContext,
        domains: &[String],
        nonce: &str,
        versions: &[IpVersion],
    ) -> Result<(Vec<Finding>, bool)> {
        let mut findings = Vec::new();
        let mut results: IndexMap<IpVersion, Value> = IndexMap::new();

        for version in versions {
            let body = json!({ "domains": domains, "nonce": nonce });
            match ctx.oracle.post("check-http", &body, *version) {
                Ok(response) => {
                    results.insert(*version, response.get("http").cloned().unwrap_or_default());
                }
                Err(e) => findings.push(
                    Finding::new(Status::Warning, "diagnosis_http_could_not_diagnose")
                        .with_meta("reason", "remote_diagnosis_failed")
                        .with_meta("ipversion", version.number())
                        .with_data("error", e.to_string())
                        .with_detail("diagnosis_http_could_not_diagnose_details"),
                ),
            }
        }

        if results.is_empty() {
            return Ok((findings, false));
        }

        let status = |version: &IpVersion, domain: &str| -> String {
            results[version]
                .get(domain)
                .and_then(|r| r.get("status"))
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_ERROR)
                .to_string()
        };

        let mut hairpinning = false;
        for domain in domains {
            let passed: Vec<IpVersion> = results
                .keys()
                .filter(|v| status(v, domain) == "ok")
                .copied()
                .collect();

            if passed.len() == results.len() {
                hairpinning |= results.contains_key(&IpVersion::V4);
                findings.push(
                    Finding::new(Status::Success, "diagnosis_http_ok")
                        .with_meta("domain", domain.as_str()),
                );
            } else if passed.is_empty() {
                let reference = if results.contains_key(&IpVersion::V4) {
                    IpVersion::V4
                } else {
                    IpVersion::V6
                };
                findings.push(
                    Finding::new(Status::Error, "diagnosis_http_unreachable")
                        .with_meta("domain", domain.as_str())
                        .with_detail(status_detail(&status(&reference, domain))),
                );
            } else {
                let passed = passed[0];
                let failed = passed.other();
                let detail = status_detail(&status(&failed, domain));

                let basic_records = |meta: &Meta| {
                    meta.get("domain").and_then(Value::as_str) == Some(domain.as_str())
                        && meta.get("category").and_then(Value::as_str) == Some("basic")
                        && meta.len() == 2
                };

                if failed == IpVersion::V4 || ipv6_is_important(ctx, basic_records)? {
                    findings.push(
                        Finding::new(Status::Error, "diagnosis_http_partially_unreachable")
                            .with_meta("domain", domain.as_str())
                            .with_data("passed", passed.number())
                            .with_data("failed", failed.number())
                            .with_detail(detail),
                    );
                } else {
                    hairpinning = true;
                    findings.push(
                        Finding::new(Status::Success, "diagnosis_http_ok")
                            .with_meta("domain", domain.as_str()),
                    );
                    findings.push(
                        Finding::new(Status::Info, "diagnosis_http_partially_unreachable")
                            .with_meta("test", "ipv6")
                            .with_meta("domain", domain.as_str())
                            .with_data("passed", passed.number())
                            .with_data("failed", failed.number())
                            .with_detail(detail),
                    );
                }
            }
        }

        Ok((findings, hairpinning))
    }

    fn test_hairpinning(ctx: &DiagnosisContext) -> Result<Option<Finding>> {
        let Some(ipv4) = ctx.cache.find("ip", &ip_meta(IpVersion::V4))? else {
            return Ok(None);
        };
        let Some(global) = ipv4.data_str("global") else {
            return Ok(None);
        };

        match ctx
            .network
            .head(&format!("http://{global}"), ctx.settings.hairpin_timeout)
        {
            ProbeOutcome::TimedOut => Ok(Some(
                Finding::new(Status::Warning, "diagnosis_http_hairpinning_issue")
                    .with_meta("test", "hairpinning")
                    .with_detail("diagnosis_http_hairpinning_issue_details"),
            )),
            ProbeOutcome::Reached => Ok(None),
            ProbeOutcome::Failed(e) => {
                tracing::debug!("Hairpinning probe failed: {}", e);
                Ok(None)
            }
        }
    }
}

impl Diagnoser for Web {
    fn id(&self) -> &'static str {
        "web"
    }

    fn cache_duration(&self) -> u64 {
        600
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ip"]
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut domains = Vec::new();

        for domain in ctx.domains.list_domains()? {
            if Self::conf_is_up_to_date(ctx, &domain) {
                domains.push(domain);
            } else {
                findings.push(
                    Finding::new(Status::Warning, "diagnosis_http_nginx_conf_not_up_to_date")
                        .with_meta("domain", domain)
                        .with_detail("diagnosis_http_nginx_conf_not_up_to_date_details"),
                );
            }
        }

        let nonce = new_nonce();
        Self::publish_nonce(ctx, &nonce)?;

        if domains.is_empty() {
            return Ok(findings);
        }

        let versions = available_ip_versions(ctx)?;
        let (http, hairpinning) = Self::test_http(ctx, &domains, &nonce, &versions)?;
        findings.extend(http);

        // Only meaningful once port forwarding is known to work
        if hairpinning && let Some(finding) = Self::test_hairpinning(ctx)? {
            findings.push(finding);
        }

        Ok(findings)
    }
}
