//! HTTP clients for the remote diagnosis oracle and the paste service

use hostward_core::{Error, IpVersion, PasteService, RemoteOracle, Result};
use serde_json::Value;
use std::net::ToSocketAddrs;
use std::time::Duration;

/// Build an agent that only connects over `version`
pub(crate) fn agent_for(version: Option<IpVersion>, timeout: Duration) -> ureq::Agent {
    let builder = ureq::AgentBuilder::new().timeout(timeout);
    match version {
        Some(version) => builder
            .resolver(move |netloc: &str| {
                netloc
                    .to_socket_addrs()
                    .map(|addrs| addrs.filter(|addr| version.matches(addr)).collect())
            })
            .build(),
        None => builder.build(),
    }
}

/// The remote oracle reachable at `https://<host>/<endpoint>`
#[derive(Debug, Clone)]
pub struct HttpOracle {
    host: String,
    timeout: Duration,
}

impl HttpOracle {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
        }
    }
}

impl RemoteOracle for HttpOracle {
    fn post(&self, endpoint: &str, payload: &Value, ipversion: IpVersion) -> Result<Value> {
        let url = format!("https://{}/{}", self.host, endpoint);
        tracing::debug!("POST {} over IPv{}", url, ipversion);

        let response = agent_for(Some(ipversion), self.timeout)
            .post(&url)
            .send_json(payload);

        match response {
            Ok(response) => {
                let content = response
                    .into_string()
                    .map_err(|e| Error::Oracle(format!("Failed to read answer from {url}: {e}")))?;
                serde_json::from_str(&content).map_err(|_| {
                    Error::Oracle(format!("Failed to parse answer from {url}: {content}"))
                })
            }
            Err(ureq::Error::Status(400, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(Error::Oracle(format!("Diagnosis request was refused: {body}")))
            }
            Err(ureq::Error::Status(code, _)) => Err(Error::Oracle(format!(
                "Failed to diagnose through {url} (status code {code})"
            ))),
            Err(ureq::Error::Transport(e)) => {
                Err(Error::Oracle(format!("Failed to reach {url}: {e}")))
            }
        }
    }
}

/// Hastebin-compatible paste service
#[derive(Debug, Clone)]
pub struct HttpPaste {
    url: String,
}

impl HttpPaste {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl PasteService for HttpPaste {
    fn upload(&self, content: &str) -> Result<String> {
        let endpoint = format!("{}/documents", self.url);

        let answer: Value = agent_for(None, Duration::from_secs(30))
            .post(&endpoint)
            .send_string(content)
            .map_err(|e| Error::Message(format!("Failed to upload to {endpoint}: {e}")))?
            .into_json()
            .map_err(|e| Error::Message(format!("Invalid answer from {endpoint}: {e}")))?;

        let key = answer
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Message(format!("No key in answer from {endpoint}: {answer}")))?;

        Ok(format!("{}/raw/{}", self.url, key))
    }
}
