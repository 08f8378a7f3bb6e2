//! Internet connectivity and name resolution

use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Message, Status};
use hostward_core::{IpVersion, Result};
use serde_json::Value;

#[derive(Debug, Default, Clone, Copy)]
pub struct Ip;

impl Ip {
    fn check_version(ctx: &DiagnosisContext, version: IpVersion) -> (bool, Finding) {
        let test = format!("ipv{version}");

        let connected = ctx.network.can_reach_internet(version);
        let global = if connected {
            ctx.network.public_ip(version).unwrap_or_else(|e| {
                tracing::warn!("Failed to fetch the global IPv{}: {}", version, e);
                None
            })
        } else {
            None
        };
        let local = ctx.network.local_ip(version);

        let finding = match (&global, version) {
            (Some(_), _) => Finding::new(Status::Success, format!("diagnosis_ip_connected_{test}"))
                .with_detail(Message::from("diagnosis_ip_global"))
                .with_detail(Message::from("diagnosis_ip_local")),
            (None, IpVersion::V4) => Finding::new(Status::Error, "diagnosis_ip_no_ipv4"),
            (None, IpVersion::V6) => Finding::new(Status::Warning, "diagnosis_ip_no_ipv6")
                .with_detail(Message::from("diagnosis_ip_no_ipv6_tip")),
        };

        let finding = finding
            .with_meta("test", test)
            .with_data("global", global.map_or(Value::Null, Value::from))
            .with_data("local", local.map_or(Value::Null, Value::from));

        (connected, finding)
    }
}

impl Diagnoser for Ip {
    fn id(&self) -> &'static str {
        "ip"
    }

    fn cache_duration(&self) -> u64 {
        60
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let (v4, ipv4) = Self::check_version(ctx, IpVersion::V4);
        let (v6, ipv6) = Self::check_version(ctx, IpVersion::V6);

        let resolution = if ctx.network.can_resolve() {
            Finding::new(Status::Success, "diagnosis_ip_dnsresolution_working")
        } else if !v4 && !v6 {
            Finding::new(Status::Error, "diagnosis_ip_not_connected_at_all")
        } else {
            Finding::new(Status::Error, "diagnosis_ip_broken_dnsresolution")
        };

        Ok(vec![ipv4, ipv6, resolution.with_meta("test", "dnsresolv")])
    }
}
