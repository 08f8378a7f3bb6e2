//! Everything a category check reads from

use super::cache::ReportCache;
use super::i18n::{category_description, strip_html};
use hostward_config::{Config, Criteria, IgnoreFilterStore};
use hostward_core::{
    DnsResolver, DomainDirectory, NetworkProbe, RemoteOracle, ServiceRegistry, SystemProbe,
    Translator, Whois,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Tunables of the category checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSettings {
    /// Directory with one `<domain>.conf` reverse-proxy file per domain
    pub nginx_conf_dir: PathBuf,
    /// Directory served under `/.well-known/hostward-diagnosis/`
    pub well_known_dir: PathBuf,
    /// Host of the remote oracle, also used for the outgoing SMTP probe
    pub oracle_host: String,
    /// Timeout of the hairpinning probe
    pub hairpin_timeout: Duration,
    /// Package the other tracked packages must agree with
    pub core_package: String,
}

impl CheckSettings {
    /// Settings from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            nginx_conf_dir: config.paths.nginx_conf_dir.clone(),
            well_known_dir: config.paths.well_known_dir.clone(),
            oracle_host: config.oracle.host.clone(),
            hairpin_timeout: Duration::from_secs(config.oracle.hairpin_timeout),
            core_package: config.packages.core.clone(),
        }
    }
}

/// Cache, filters, settings and collaborators shared by every check
pub struct DiagnosisContext {
    /// Per-category report cache
    pub cache: ReportCache,
    /// Ignore filters applied to shown reports
    pub filters: IgnoreFilterStore,
    /// Check tunables
    pub settings: CheckSettings,
    /// Message catalog
    pub translator: Box<dyn Translator>,
    /// Domains and their expected zones
    pub domains: Box<dyn DomainDirectory>,
    /// Managed services
    pub services: Box<dyn ServiceRegistry>,
    /// DNS lookups
    pub dns: Box<dyn DnsResolver>,
    /// Registrar lookups
    pub whois: Box<dyn Whois>,
    /// Local system facts
    pub system: Box<dyn SystemProbe>,
    /// Connectivity probes
    pub network: Box<dyn NetworkProbe>,
    /// Remote reachability oracle
    pub oracle: Box<dyn RemoteOracle>,
}

impl DiagnosisContext {
    /// Human description of a category
    #[must_use]
    pub fn describe(&self, id: &str) -> String {
        category_description(self.translator.as_ref(), id)
    }

    /// Plain-text message for log lines
    pub fn message<I, K, V>(&self, key: &str, args: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let args: IndexMap<String, Value> = args
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        strip_html(&self.translator.translate(key, &args))
    }

    /// Plain-text message without arguments
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        strip_html(&self.translator.translate(key, &IndexMap::new()))
    }

    /// Ignore filters of a category
    ///
    /// An unreadable filter file is logged and treated as empty.
    #[must_use]
    pub fn filters_for(&self, id: &str) -> Vec<Criteria> {
        match self.filters.filters_for(id) {
            Ok(filters) => filters,
            Err(e) => {
                tracing::warn!("Failed to read ignore filters: {}", e);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for DiagnosisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisContext")
            .field("cache", &self.cache)
            .field("filters", &self.filters)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
