//! Real implementations of the collaborator traits
//!
//! These talk to the actual system: `dig`, `whois`, `dpkg`, `systemctl`,
//! `sendmail`, HTTP endpoints. Diagnosis code only sees the traits from
//! `hostward_core`, so tests substitute in-memory fakes.

mod dns;
mod domains;
mod host;
mod mailer;
mod network;
mod oracle;
mod services;
mod whois;

pub use dns::DigResolver;
pub use domains::ConfigDomainDirectory;
pub use host::{HostProbe, parse_policy_repo};
pub use mailer::SendmailMailer;
pub use network::UreqNetworkProbe;
pub use oracle::{HttpOracle, HttpPaste};
pub use services::YamlServiceRegistry;
pub use whois::WhoisCommand;

use hostward_core::{Error, Result};
use std::process::Output;

/// Run a program to completion, capturing both streams
///
/// A non-zero exit status is not an error; callers inspect it.
///
/// # Errors
///
/// Returns error if the program is not installed or cannot be started
pub(crate) fn capture(program: &str, args: &[&str]) -> Result<Output> {
    let path = which::which(program)
        .map_err(|_| Error::Message(format!("Command '{program}' not found in PATH")))?;

    tracing::debug!("Running {} {:?}", program, args);
    duct::cmd(path, args)
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|e| Error::Message(format!("Failed to run {program}: {e}")))
}

/// Captured stdout of a successful run, trimmed
///
/// # Errors
///
/// Returns error if the program cannot run or exits with a failure
pub(crate) fn capture_stdout(program: &str, args: &[&str]) -> Result<String> {
    let output = capture(program, args)?;
    if !output.status.success() {
        return Err(Error::Message(format!(
            "{program} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
