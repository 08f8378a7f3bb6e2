//! Configuration management
//!
//! This module handles loading and saving hostward configuration.

use crate::Result;
use crate::dirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem locations used by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one cached report per diagnosis category
    pub cache_dir: PathBuf,

    /// YAML document holding the ignore filters
    pub diagnosis_config: PathBuf,

    /// Hook root shipped with the system
    pub hooks_dir: PathBuf,

    /// Hook root managed by the administrator
    pub custom_hooks_dir: PathBuf,

    /// YAML description of the managed services
    pub services_file: PathBuf,

    /// Directory containing one reverse-proxy configuration per domain
    pub nginx_conf_dir: PathBuf,

    /// Directory served under `/.well-known/hostward-diagnosis/`
    pub well_known_dir: PathBuf,

    /// Directory containing `<domain>.mail.txt` DKIM public keys
    pub dkim_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(dirs::CACHE_DIR),
            diagnosis_config: PathBuf::from(dirs::DIAGNOSIS_CONFIG),
            hooks_dir: PathBuf::from(dirs::HOOKS_DIR),
            custom_hooks_dir: PathBuf::from(dirs::CUSTOM_HOOKS_DIR),
            services_file: PathBuf::from(dirs::SERVICES_FILE),
            nginx_conf_dir: PathBuf::from(dirs::NGINX_CONF_DIR),
            well_known_dir: PathBuf::from(dirs::WELL_KNOWN_DIR),
            dkim_dir: PathBuf::from(dirs::DKIM_DIR),
        }
    }
}

/// Remote diagnosis oracle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Host name of the oracle; requests go to `https://<host>/<endpoint>`
    pub host: String,

    /// Timeout of oracle requests, in seconds
    pub timeout: u64,

    /// Timeout of the hairpinning probe, in seconds
    pub hairpin_timeout: u64,

    /// Paste service receiving shared reports
    pub paste_url: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            host: "diagnosis.hostward.org".to_string(),
            timeout: 30,
            hairpin_timeout: 5,
            paste_url: "https://paste.hostward.org".to_string(),
        }
    }
}

/// DNS resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Public resolvers used when a query must bypass the local resolver
    pub external_resolvers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            external_resolvers: vec![
                "1.1.1.1".to_string(),
                "9.9.9.9".to_string(),
                "8.8.8.8".to_string(),
            ],
        }
    }
}

/// Domains served by this host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainsConfig {
    /// The main domain; defaults to the first listed domain
    pub main: Option<String>,

    /// Every domain, main included
    pub list: Vec<String>,
}

impl DomainsConfig {
    /// All domains, the main domain first
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        let mut domains = Vec::with_capacity(self.list.len() + 1);
        if let Some(main) = &self.main {
            domains.push(main.clone());
        }
        for domain in &self.list {
            if !domains.contains(domain) {
                domains.push(domain.clone());
            }
        }
        domains
    }

    /// The main domain, if any domain is configured
    #[must_use]
    pub fn main_domain(&self) -> Option<String> {
        self.main.clone().or_else(|| self.list.first().cloned())
    }
}

/// Packages whose versions the base system check compares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Package every other tracked package must agree with
    pub core: String,

    /// Packages reported by the base system check
    pub tracked: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            core: "hostward".to_string(),
            tracked: vec!["hostward".to_string(), "hostward-admin".to_string()],
        }
    }
}

/// Hostward configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Remote oracle settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// DNS settings
    #[serde(default)]
    pub dns: ResolverConfig,

    /// Served domains
    #[serde(default)]
    pub domains: DomainsConfig,

    /// Tracked packages
    #[serde(default)]
    pub packages: PackagesConfig,
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or TOML parsing fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            hostward_core::Error::Config(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            hostward_core::Error::Config(format!(
                "Failed to parse config file {}: {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Load the configuration, falling back to defaults
    ///
    /// An explicitly given path must exist. Without one, the default
    /// location is used when present and built-in defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the chosen file cannot be read or parsed
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Path::new(dirs::CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            tracing::debug!(
                "No configuration at {}, using defaults",
                default_path.display()
            );
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            hostward_core::Error::Config(format!("Failed to serialize config: {e}"))
        })?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| {
                hostward_core::Error::Config(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        fs::write(path.as_ref(), content).map_err(|e| {
            hostward_core::Error::Config(format!(
                "Failed to write config file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        Ok(())
    }
}
