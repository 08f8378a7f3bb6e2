//! Outgoing SMTP

use crate::diagnosis::context::DiagnosisContext;
use crate::diagnosis::diagnoser::Diagnoser;
use crate::diagnosis::report::{Finding, Status};
use hostward_core::Result;
use std::time::Duration;

const SMTP_PORT: u16 = 25;

#[derive(Debug, Default, Clone, Copy)]
pub struct Mail;

impl Diagnoser for Mail {
    fn id(&self) -> &'static str {
        "mail"
    }

    fn cache_duration(&self) -> u64 {
        3600
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ip"]
    }

    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>> {
        let open = ctx.network.tcp_connect(
            &ctx.settings.oracle_host,
            SMTP_PORT,
            Duration::from_secs(2),
        );

        let finding = if open {
            Finding::new(Status::Success, "diagnosis_mail_outgoing_port_25_ok")
        } else {
            Finding::new(Status::Error, "diagnosis_mail_outgoing_port_25_blocked")
        };

        Ok(vec![finding.with_meta("test", "outgoing_port_25")])
    }
}
