//! Connectivity probes

use super::oracle::agent_for;
use hostward_core::{IpVersion, NetworkProbe, ProbeOutcome, Result};
use std::error::Error as _;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Well-known anycast resolvers used to test raw connectivity
const V4_TARGETS: [&str; 2] = ["1.1.1.1:443", "9.9.9.9:443"];
const V6_TARGETS: [&str; 2] = ["[2606:4700:4700::1111]:443", "[2620:fe::fe]:443"];

/// Probe using plain sockets and `ureq`
#[derive(Debug, Clone)]
pub struct UreqNetworkProbe {
    oracle_host: String,
}

impl UreqNetworkProbe {
    pub fn new(oracle_host: impl Into<String>) -> Self {
        Self {
            oracle_host: oracle_host.into(),
        }
    }
}

fn targets(version: IpVersion) -> &'static [&'static str] {
    match version {
        IpVersion::V4 => &V4_TARGETS,
        IpVersion::V6 => &V6_TARGETS,
    }
}

fn is_timeout(error: &ureq::Transport) -> bool {
    error
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(|e| matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
}

impl NetworkProbe for UreqNetworkProbe {
    fn can_reach_internet(&self, version: IpVersion) -> bool {
        targets(version).iter().any(|target| {
            target
                .parse::<SocketAddr>()
                .is_ok_and(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
        })
    }

    fn public_ip(&self, version: IpVersion) -> Result<Option<String>> {
        let url = format!("https://{}/ip", self.oracle_host);
        let ip = match agent_for(Some(version), Duration::from_secs(10)).get(&url).call() {
            Ok(response) => response.into_string()?.trim().to_string(),
            Err(e) => {
                tracing::debug!("Could not fetch public IPv{} from {}: {}", version, url, e);
                return Ok(None);
            }
        };
        Ok(ip.parse::<std::net::IpAddr>().ok().map(|_| ip))
    }

    fn local_ip(&self, version: IpVersion) -> Option<String> {
        // Connecting a UDP socket sends nothing but selects the outgoing interface
        let (bind, target) = match version {
            IpVersion::V4 => ("0.0.0.0:0", V4_TARGETS[0]),
            IpVersion::V6 => ("[::]:0", V6_TARGETS[0]),
        };
        let socket = UdpSocket::bind(bind).ok()?;
        socket.connect(target).ok()?;
        socket.local_addr().ok().map(|addr| addr.ip().to_string())
    }

    fn can_resolve(&self) -> bool {
        (self.oracle_host.as_str(), 443)
            .to_socket_addrs()
            .is_ok_and(|mut addrs| addrs.next().is_some())
    }

    fn head(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        match agent_for(None, timeout).head(url).call() {
            Ok(_) | Err(ureq::Error::Status(..)) => ProbeOutcome::Reached,
            Err(ureq::Error::Transport(e)) if is_timeout(&e) => ProbeOutcome::TimedOut,
            Err(ureq::Error::Transport(e)) => ProbeOutcome::Failed(e.to_string()),
        }
    }

    fn tcp_connect(&self, host: &str, port: u16, timeout: Duration) -> bool {
        let Ok(addrs) = (host, port).to_socket_addrs() else {
            return false;
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
    }
}
