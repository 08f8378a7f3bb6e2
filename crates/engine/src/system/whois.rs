use super::capture;
use hostward_core::{Result, Whois};

/// `whois -H` lookups
#[derive(Debug, Clone, Copy, Default)]
pub struct WhoisCommand;

impl Whois for WhoisCommand {
    fn lookup(&self, domain: &str) -> Result<String> {
        let output = capture("whois", &["-H", domain])?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
