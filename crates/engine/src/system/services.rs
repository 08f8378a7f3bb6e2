//! Service registry backed by a YAML description file

use super::capture;
use hostward_core::{Error, Result, ServiceInfo, ServiceRegistry, ServiceStatus};
use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;

/// Services listed in a YAML mapping of name to [`ServiceInfo`]
///
/// ```yaml
/// nginx:
///   needs_exposed_ports: [80, 443]
///   test_conf: nginx -t
/// redis-server:
/// ```
#[derive(Debug, Clone)]
pub struct YamlServiceRegistry {
    path: PathBuf,
}

impl YamlServiceRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Run a shell snippet, returning whether it succeeded and its combined output
fn shell(command: &str) -> Result<(bool, String)> {
    let output = capture("sh", &["-c", command])?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((output.status.success(), text))
}

fn systemd_status(name: &str) -> Result<String> {
    let output = capture("systemctl", &["is-active", name])?;
    let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(match state.as_str() {
        "active" => "running".to_string(),
        "inactive" | "failed" => state,
        _ => "unknown".to_string(),
    })
}

impl ServiceRegistry for YamlServiceRegistry {
    fn list_services(&self) -> Result<IndexMap<String, ServiceInfo>> {
        if !self.path.exists() {
            tracing::debug!("No services file at {}", self.path.display());
            return Ok(IndexMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let services: IndexMap<String, Option<ServiceInfo>> = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))?;

        // A bare name means a service with default settings
        Ok(services
            .into_iter()
            .map(|(name, info)| (name, info.unwrap_or_default()))
            .collect())
    }

    fn status(&self, name: &str, info: &ServiceInfo) -> Result<ServiceStatus> {
        let status = match &info.test_status {
            Some(command) => {
                if shell(command)?.0 {
                    "running".to_string()
                } else {
                    "inactive".to_string()
                }
            }
            None => systemd_status(name)?,
        };

        let (configuration, configuration_details) = match &info.test_conf {
            None => ("unknown".to_string(), Vec::new()),
            Some(command) => match shell(command)? {
                (true, _) => ("valid".to_string(), Vec::new()),
                (false, output) => (
                    "broken".to_string(),
                    output
                        .lines()
                        .map(str::trim_end)
                        .filter(|line| !line.is_empty())
                        .map(ToString::to_string)
                        .collect(),
                ),
            },
        };

        Ok(ServiceStatus {
            status,
            configuration,
            configuration_details,
        })
    }
}
