//! Status and configuration of the managed services

use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Status};
use hostward_core::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct Services;

impl Diagnoser for Services {
    fn id(&self) -> &'static str {
        "services"
    }

    fn cache_duration(&self) -> u64 {
        300
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let mut services: Vec<_> = ctx.services.list_services()?.into_iter().collect();
        services.sort_by(|a, b| a.0.cmp(&b.0));

        let mut findings = Vec::with_capacity(services.len());
        for (name, info) in services {
            let status = ctx.services.status(&name, &info)?;

            let finding = if status.status != "running" {
                let level = if status.status == "unknown" {
                    Status::Warning
                } else {
                    Status::Error
                };
                Finding::new(level, "diagnosis_services_bad_status")
                    .with_detail("diagnosis_services_bad_status_tip")
            } else if status.configuration == "broken" {
                // Raw checker output, rendered as-is
                Finding::new(Status::Warning, "diagnosis_services_conf_broken")
                    .with_details(status.configuration_details.iter().map(String::as_str))
            } else {
                Finding::new(Status::Success, "diagnosis_services_running")
            };

            findings.push(
                finding
                    .with_meta("service", name)
                    .with_data("status", status.status)
                    .with_data("configuration", status.configuration),
            );
        }

        Ok(findings)
    }
}
