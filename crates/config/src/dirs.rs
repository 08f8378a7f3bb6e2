//! Fixed filesystem locations
//!
//! Hostward runs as a system service, so its default paths follow the FHS
//! rather than per-user base directories. Every one of them can be
//! overridden from the `[paths]` section of the configuration file.

/// Default configuration file
pub const CONFIG_FILE: &str = "/etc/hostward/config.toml";

/// Default diagnosis cache directory
pub const CACHE_DIR: &str = "/var/cache/hostward/diagnosis";

/// Default ignore-filter document
pub const DIAGNOSIS_CONFIG: &str = "/etc/hostward/diagnosis.yml";

/// System hook root
pub const HOOKS_DIR: &str = "/usr/share/hostward/hooks";

/// Administrator hook root
pub const CUSTOM_HOOKS_DIR: &str = "/etc/hostward/hooks.d";

/// Default service registry
pub const SERVICES_FILE: &str = "/etc/hostward/services.yml";

/// Default reverse-proxy configuration directory
pub const NGINX_CONF_DIR: &str = "/etc/nginx/conf.d";

/// Default directory served as the diagnosis probe path
pub const WELL_KNOWN_DIR: &str = "/var/www/.well-known/hostward-diagnosis";

/// Default DKIM key directory
pub const DKIM_DIR: &str = "/etc/dkim";
