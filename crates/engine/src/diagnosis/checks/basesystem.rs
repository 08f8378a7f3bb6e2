//! Hardware, kernel, distribution and package versions

use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Message, Status};
use hostward_core::{Error, Result};

/// `major.minor` part of a version string
fn major_minor(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BaseSystem;

impl Diagnoser for BaseSystem {
    fn id(&self) -> &'static str {
        "basesystem"
    }

    fn cache_duration(&self) -> u64 {
        3600 * 24
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        let virt = ctx.system.virtualization()?;
        let arch = ctx.system.architecture()?;
        let mut hardware = Finding::new(
            Status::Info,
            Message::with_args(
                "diagnosis_basesystem_hardware",
                [("virt", virt.as_str()), ("arch", arch.as_str())],
            ),
        )
        .with_meta("test", "hardware")
        .with_data("virt", virt.as_str())
        .with_data("arch", arch.as_str());
        if let Some(model) = ctx.system.board_model() {
            hardware = hardware.with_data("board", model.as_str()).with_detail(
                Message::with_args("diagnosis_basesystem_hardware_board", [("model", model)]),
            );
        }
        findings.push(hardware);

        let kernel_version = ctx.system.kernel_version()?;
        findings.push(
            Finding::new(
                Status::Info,
                Message::with_args(
                    "diagnosis_basesystem_kernel",
                    [("kernel_version", kernel_version)],
                ),
            )
            .with_meta("test", "kernel"),
        );

        let debian_version = ctx.system.distribution_version()?;
        findings.push(
            Finding::new(
                Status::Info,
                Message::with_args(
                    "diagnosis_basesystem_host",
                    [("debian_version", debian_version)],
                ),
            )
            .with_meta("test", "host"),
        );

        let packages = ctx.system.package_versions()?;
        let core_name = &ctx.settings.core_package;
        let core = packages.get(core_name).ok_or_else(|| {
            Error::Message(format!("Package {core_name} is not installed"))
        })?;

        // A half-done upgrade leaves packages on different major.minor series
        let series = major_minor(&core.version);
        let consistent = packages
            .values()
            .all(|p| major_minor(&p.version) == series);

        let details: Vec<Message> = packages
            .iter()
            .map(|(package, p)| {
                Message::with_args(
                    "diagnosis_basesystem_single_version",
                    [
                        ("package", package.as_str()),
                        ("version", p.version.as_str()),
                        ("repo", p.repo.as_str()),
                    ],
                )
            })
            .collect();

        let summary = if consistent {
            Finding::new(
                Status::Info,
                Message::with_args(
                    "diagnosis_basesystem_main_version",
                    [
                        ("main_version", core.version.as_str()),
                        ("repo", core.repo.as_str()),
                    ],
                ),
            )
        } else {
            Finding::new(Status::Error, "diagnosis_basesystem_inconsistent_versions")
        };
        findings.push(
            summary
                .with_meta("test", "versions")
                .with_data("main_version", core.version.as_str())
                .with_data("repo", core.repo.as_str())
                .with_details(details),
        );

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_minor() {
        assert_eq!(major_minor("11.2.14"), "11.2");
        assert_eq!(major_minor("11.2"), "11.2");
        assert_eq!(major_minor("12"), "12");
        assert_ne!(major_minor("11.10.1"), major_minor("11.1.0"));
    }
}
