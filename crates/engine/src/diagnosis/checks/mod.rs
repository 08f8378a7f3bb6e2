//! Built-in diagnosis categories
//!
//! Each category is exposed to the hook registry as an embedded module
//! named `diagnosis/<id>`, referenced by a `<priority>-<id>.module` file in
//! the `diagnosis` hook directory.

mod basesystem;
mod dnsrecords;
mod expiration;
mod ip;
mod mail;
mod ports;
mod services;
mod web;

pub use basesystem::BaseSystem;
pub use dnsrecords::{Current, DYNDNS_DOMAINS, DnsRecords, RecordResult, record_matches};
pub use expiration::{Expiration, ExpiryAlert, classify, parse_whois};
pub use ip::Ip;
pub use mail::Mail;
pub use ports::Ports;
pub use services::Services;
pub use web::{PROBE_LOCATION, Web};

use super::context::DiagnosisContext;
use super::diagnoser::{Diagnoser, diagnose};
use super::report::{Meta, Status};
use crate::hooks::ModuleTable;
use hostward_core::{IpVersion, Result};
use serde_json::Value;

/// Argument forcing a category to run despite a fresh cache
pub const FORCE_ARG: &str = "--force";

/// Every built-in category
#[must_use]
pub fn all() -> Vec<Box<dyn Diagnoser>> {
    vec![
        Box::new(BaseSystem),
        Box::new(Ip),
        Box::new(DnsRecords),
        Box::new(Ports),
        Box::new(Web),
        Box::new(Mail),
        Box::new(Services),
    ]
}

/// Module key of a category
#[must_use]
pub fn module_key(id: &str) -> String {
    format!("diagnosis/{id}")
}

/// Register `diagnosers` as embedded modules running against `ctx`
pub fn register_modules<'a>(
    table: &mut ModuleTable<'a>,
    ctx: &'a DiagnosisContext,
    diagnosers: Vec<Box<dyn Diagnoser>>,
) {
    for diagnoser in diagnosers {
        table.register(module_key(diagnoser.id()), move |args, _env| {
            let force = args.iter().any(|arg| arg == FORCE_ARG);
            diagnose(diagnoser.as_ref(), ctx, force)?.into_hook_return()
        });
    }
}

pub(crate) fn ip_meta(version: IpVersion) -> Meta {
    let mut meta = Meta::new();
    meta.insert("test".into(), Value::from(format!("ipv{version}")));
    meta
}

/// IP versions the last `ip` report found working
pub(crate) fn available_ip_versions(ctx: &DiagnosisContext) -> Result<Vec<IpVersion>> {
    let mut versions = Vec::new();
    for version in IpVersion::ALL {
        let finding = ctx.cache.find("ip", &ip_meta(version))?;
        if finding.is_some_and(|f| f.status == Status::Success) {
            versions.push(version);
        }
    }
    Ok(versions)
}

/// Whether a cached `dnsrecords` finding selected by `select` shows an
/// apex AAAA record, making IPv6 failures errors
pub(crate) fn ipv6_is_important<F>(ctx: &DiagnosisContext, select: F) -> Result<bool>
where
    F: Fn(&Meta) -> bool,
{
    let Some(report) = ctx.cache.load("dnsrecords")? else {
        return Ok(false);
    };

    Ok(report
        .items
        .iter()
        .filter(|item| select(&item.meta))
        .any(|item| matches!(item.data_str("AAAA:@"), Some("OK" | "WRONG"))))
}
