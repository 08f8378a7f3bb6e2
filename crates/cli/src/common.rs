//! Shared state of CLI commands

use anyhow::{Context, Result};
use hostward_config::{Config, IgnoreFilterStore};
use hostward_engine::diagnosis::checks;
use hostward_engine::diagnosis::{
    Catalog, CheckSettings, DiagnosisContext, DiagnosisService, ReportCache,
};
use hostward_engine::hooks::{HookExecutor, HookRegistry, ModuleTable};
use hostward_engine::system::{
    ConfigDomainDirectory, DigResolver, HostProbe, HttpOracle, HttpPaste, SendmailMailer,
    UreqNetworkProbe, WhoisCommand, YamlServiceRegistry,
};
use std::sync::Arc;
use std::time::Duration;

/// Interface name exported to hooks and used to pick output styles
pub const INTERFACE: &str = "cli";

/// Runtime context for CLI commands
#[derive(Clone)]
pub struct RuntimeContext {
    /// Shared configuration
    pub config: Arc<Config>,
    /// Hook discovery over the configured roots
    pub registry: HookRegistry,
}

impl RuntimeContext {
    /// Create a runtime context from a loaded configuration
    pub fn new(config: Config) -> Self {
        let registry = HookRegistry::from_config(&config);
        Self {
            config: Arc::new(config),
            registry,
        }
    }

    /// Diagnosis context wired to the real system
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded message catalog is invalid
    pub fn diagnosis_context(&self) -> Result<DiagnosisContext> {
        let config = &self.config;
        let cache = ReportCache::new(&config.paths.cache_dir);

        Ok(DiagnosisContext {
            cache: cache.clone(),
            filters: IgnoreFilterStore::new(&config.paths.diagnosis_config),
            settings: CheckSettings::from_config(config),
            translator: Box::new(Catalog::english().context("Failed to load message catalog")?),
            domains: Box::new(ConfigDomainDirectory::new(
                config.domains.clone(),
                cache,
                &config.paths.dkim_dir,
            )),
            services: Box::new(YamlServiceRegistry::new(&config.paths.services_file)),
            dns: Box::new(DigResolver::new(config.dns.external_resolvers.clone())),
            whois: Box::new(WhoisCommand),
            system: Box::new(HostProbe::new(config.packages.tracked.clone())),
            network: Box::new(UreqNetworkProbe::new(&config.oracle.host)),
            oracle: Box::new(HttpOracle::new(
                &config.oracle.host,
                Duration::from_secs(config.oracle.timeout),
            )),
        })
    }

    /// Run `f` with an executor knowing the built-in diagnosis modules
    ///
    /// # Errors
    ///
    /// Returns an error if the diagnosis context cannot be built, or `f`'s error
    pub fn with_executor<R>(
        &self,
        f: impl FnOnce(&HookExecutor<'_>, &DiagnosisContext) -> Result<R>,
    ) -> Result<R> {
        let ctx = self.diagnosis_context()?;
        let mut table = ModuleTable::new();
        checks::register_modules(&mut table, &ctx, checks::all());
        let executor = HookExecutor::new(table).interface(INTERFACE);
        f(&executor, &ctx)
    }

    /// Run `f` with the diagnosis driver
    ///
    /// # Errors
    ///
    /// Returns an error if the diagnosis context cannot be built, or `f`'s error
    pub fn with_diagnosis<R>(&self, f: impl FnOnce(&DiagnosisService<'_>) -> Result<R>) -> Result<R> {
        let paste = HttpPaste::new(&self.config.oracle.paste_url);
        let mailer = SendmailMailer;

        self.with_executor(|executor, ctx| {
            let service = DiagnosisService::new(&self.registry, executor, ctx, &paste, &mailer)
                .interface(INTERFACE);
            f(&service)
        })
    }
}
