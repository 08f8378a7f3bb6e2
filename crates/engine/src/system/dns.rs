//! DNS queries through `dig`

use super::capture;
use hostward_core::{DnsAnswer, DnsResolver, DnsStatus, ResolverPolicy};

/// Resolver shelling out to `dig +short`
#[derive(Debug, Clone)]
pub struct DigResolver {
    external_resolvers: Vec<String>,
    timeout_secs: u64,
}

impl DigResolver {
    /// Create a resolver using `external_resolvers` for forced external queries
    pub fn new(external_resolvers: Vec<String>) -> Self {
        Self {
            external_resolvers,
            timeout_secs: 5,
        }
    }

    fn query(&self, query: &str, record_type: &str, server: Option<&str>) -> DnsAnswer {
        let time = format!("+time={}", self.timeout_secs);
        let server = server.map(|s| format!("@{s}"));

        let mut args = vec!["+short", "+tries=1", time.as_str()];
        if let Some(server) = &server {
            args.push(server);
        }
        args.extend([query, record_type]);

        let output = match capture("dig", &args) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("{}", e);
                return DnsAnswer::failed(DnsStatus::Error);
            }
        };
        parse_dig(&String::from_utf8_lossy(&output.stdout), output.status.success())
    }
}

/// Interpret `dig +short` output
fn parse_dig(stdout: &str, success: bool) -> DnsAnswer {
    if stdout.contains("connection timed out") || stdout.contains("no servers could be reached") {
        return DnsAnswer::failed(DnsStatus::Timeout);
    }
    if !success {
        return DnsAnswer::failed(DnsStatus::Error);
    }

    let answers: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(";;"))
        .map(ToString::to_string)
        .collect();

    if answers.is_empty() {
        DnsAnswer::failed(DnsStatus::NoAnswer)
    } else {
        DnsAnswer::ok(answers)
    }
}

impl DnsResolver for DigResolver {
    fn dig(&self, query: &str, record_type: &str, policy: ResolverPolicy) -> DnsAnswer {
        match policy {
            ResolverPolicy::Local => self.query(query, record_type, None),
            ResolverPolicy::ForceExternal => {
                let mut last = DnsAnswer::failed(DnsStatus::Error);
                for resolver in &self.external_resolvers {
                    last = self.query(query, record_type, Some(resolver));
                    if last.status != DnsStatus::Timeout {
                        break;
                    }
                    tracing::debug!("Resolver {} timed out", resolver);
                }
                last
            }
        }
    }
}
