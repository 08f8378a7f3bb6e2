//! Local system facts

use super::{capture, capture_stdout};
use hostward_core::{Error, PackageVersion, Result, SystemProbe};
use indexmap::IndexMap;
use std::fs;

const BOARD_MODEL: &str = "/proc/device-tree/model";
const KERNEL_RELEASE: &str = "/proc/sys/kernel/osrelease";
const DEBIAN_VERSION: &str = "/etc/debian_version";

/// Probe backed by `/proc`, `systemd-detect-virt` and the dpkg/apt tools
#[derive(Debug, Clone)]
pub struct HostProbe {
    tracked_packages: Vec<String>,
}

impl HostProbe {
    pub fn new(tracked_packages: Vec<String>) -> Self {
        Self { tracked_packages }
    }
}

fn read_trimmed(path: &str) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string())
        .map_err(|e| Error::Message(format!("Failed to read {path}: {e}")))
}

/// Repository an installed version comes from, out of `apt-cache policy`
///
/// The line after the `***` marker names the source; `/var/lib/dpkg/status`
/// alone means the package was installed by hand.
#[must_use]
pub fn parse_policy_repo(policy: &str) -> String {
    let mut lines = policy.lines().skip_while(|line| !line.trim_start().starts_with("***"));
    lines.next();

    lines
        .next()
        .and_then(|source| {
            let source = source.trim();
            if source.ends_with("/var/lib/dpkg/status") {
                return Some("local".to_string());
            }
            source
                .split_whitespace()
                .nth(2)
                .map(|suite| suite.rsplit('/').next().unwrap_or(suite).to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

impl SystemProbe for HostProbe {
    fn virtualization(&self) -> Result<String> {
        // Exits non-zero and prints "none" on bare metal
        let output = capture("systemd-detect-virt", &[])?;
        let virt = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if virt.is_empty() || virt == "none" {
            "bare-metal".to_string()
        } else {
            virt
        })
    }

    fn architecture(&self) -> Result<String> {
        capture_stdout("dpkg", &["--print-architecture"])
    }

    fn board_model(&self) -> Option<String> {
        read_trimmed(BOARD_MODEL).ok().filter(|m| !m.is_empty())
    }

    fn kernel_version(&self) -> Result<String> {
        read_trimmed(KERNEL_RELEASE)
    }

    fn distribution_version(&self) -> Result<String> {
        read_trimmed(DEBIAN_VERSION)
    }

    fn package_versions(&self) -> Result<IndexMap<String, PackageVersion>> {
        let mut versions = IndexMap::new();

        for package in &self.tracked_packages {
            let version = match capture_stdout("dpkg-query", &["-W", "-f=${Version}", package]) {
                Ok(version) if !version.is_empty() => version,
                _ => {
                    tracing::debug!("Package {} is not installed", package);
                    continue;
                }
            };
            let repo = capture_stdout("apt-cache", &["policy", package])
                .map(|policy| parse_policy_repo(&policy))
                .unwrap_or_else(|_| "unknown".to_string());

            versions.insert(package.clone(), PackageVersion { version, repo });
        }

        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_repo_from_archive() {
        let policy = "hostward:\n  Installed: 11.2.3\n  Candidate: 11.2.3\n  Version table:\n \
            *** 11.2.3 500\n        500 http://forge.hostward.org/debian bookworm/stable amd64 Packages\n        \
            100 /var/lib/dpkg/status\n";
        assert_eq!(parse_policy_repo(policy), "stable");
    }

    #[test]
    fn test_policy_repo_local_install() {
        let policy = "hostward:\n  Version table:\n *** 11.2.3 100\n        100 /var/lib/dpkg/status\n";
        assert_eq!(parse_policy_repo(policy), "local");
    }

    #[test]
    fn test_policy_repo_unknown() {
        assert_eq!(parse_policy_repo("hostward:\n  Installed: (none)\n"), "unknown");
    }
}
