use hostward_core::{Error, Mailer, Result};

/// Hands messages to the local MTA via `sendmail -t`
#[derive(Debug, Clone, Copy, Default)]
pub struct SendmailMailer;

fn compose(from: &str, to: &str, subject: &str, body: &str) -> String {
    format!("From: {from}\nTo: {to}\nSubject: {subject}\n\n{body}\n")
}

impl Mailer for SendmailMailer {
    fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let sendmail = which::which("sendmail")
            .map_err(|_| Error::Message("Command 'sendmail' not found in PATH".to_string()))?;

        tracing::debug!("Sending '{}' to {}", subject, to);
        duct::cmd(sendmail, ["-t"])
            .stdin_bytes(compose(from, to, subject, body))
            .stdout_null()
            .run()
            .map_err(|e| Error::Message(format!("Failed to send mail to {to}: {e}")))?;
        Ok(())
    }
}
