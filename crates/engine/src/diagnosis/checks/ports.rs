//! Reachability of the exposed ports, checked by the remote oracle

use super::{available_ip_versions, ipv6_is_important};
use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Status};
use hostward_core::{IpVersion, Result};
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
pub struct Ports;

impl Diagnoser for Ports {
    fn id(&self) -> &'static str {
        "ports"
    }

    fn cache_duration(&self) -> u64 {
        600
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ip"]
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let services = ctx.services.list_services()?;

        // Later services claim a shared port
        let mut ports: BTreeMap<u16, String> = BTreeMap::new();
        for (service, info) in &services {
            for port in &info.needs_exposed_ports {
                ports.insert(*port, service.clone());
            }
        }

        let mut findings = Vec::new();
        let mut results: IndexMap<IpVersion, Value> = IndexMap::new();

        for version in available_ip_versions(ctx)? {
            let body = json!({ "ports": ports.keys().collect::<Vec<_>>() });
            match ctx.oracle.post("check-ports", &body, version) {
                Ok(response) => {
                    results.insert(version, response.get("ports").cloned().unwrap_or_default());
                }
                Err(e) => findings.push(
                    Finding::new(Status::Warning, "diagnosis_ports_could_not_diagnose")
                        .with_meta("reason", "remote_diagnosis_failed")
                        .with_meta("ipversion", version.number())
                        .with_data("error", e.to_string())
                        .with_detail("diagnosis_ports_could_not_diagnose_details"),
                ),
            }
        }

        if results.is_empty() {
            return Ok(findings);
        }

        let reachable =
            |version: &IpVersion, port: &str| results[version].get(port) == Some(&Value::Bool(true));

        for (port, service) in ports {
            let port = port.to_string();
            let category = services
                .get(&service)
                .and_then(|info| info.category.clone())
                .unwrap_or_else(|| "[?]".to_string());

            let base = |status: Status, summary: &str| {
                Finding::new(status, summary)
                    .with_meta("port", port.as_str())
                    .with_data("service", service.as_str())
                    .with_data("category", category.as_str())
            };

            let passed: Vec<IpVersion> = results
                .keys()
                .filter(|v| reachable(v, &port))
                .copied()
                .collect();

            if passed.len() == results.len() {
                findings.push(
                    base(Status::Success, "diagnosis_ports_ok")
                        .with_detail("diagnosis_ports_needed_by"),
                );
            } else if passed.is_empty() {
                findings.push(
                    base(Status::Error, "diagnosis_ports_unreachable")
                        .with_detail("diagnosis_ports_needed_by")
                        .with_detail("diagnosis_ports_forwarding_tip"),
                );
            } else {
                let passed = passed[0];
                let failed = passed.other();

                if failed == IpVersion::V4 || ipv6_is_important(ctx, |_| true)? {
                    findings.push(
                        base(Status::Error, "diagnosis_ports_partially_unreachable")
                            .with_data("passed", passed.number())
                            .with_data("failed", failed.number())
                            .with_detail("diagnosis_ports_needed_by")
                            .with_detail("diagnosis_ports_forwarding_tip"),
                    );
                } else {
                    findings.push(
                        base(Status::Success, "diagnosis_ports_ok")
                            .with_detail("diagnosis_ports_needed_by"),
                    );
                    // Distinct meta so a lookup by port alone finds the success
                    let mut info = base(Status::Info, "diagnosis_ports_partially_unreachable")
                        .with_data("passed", passed.number())
                        .with_data("failed", failed.number())
                        .with_detail("diagnosis_ports_needed_by")
                        .with_detail("diagnosis_ports_forwarding_tip");
                    info.meta.shift_insert(0, "test".to_string(), Value::from("ipv6"));
                    findings.push(info);
                }
            }
        }

        Ok(findings)
    }
}
