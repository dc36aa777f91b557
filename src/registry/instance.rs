//! # Service instance identity.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Public address used only to let the OS pick an outbound interface.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Identifies this process to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceInstance {
    /// Service name.
    pub name: String,
    /// Advertised address.
    pub ip: IpAddr,
    /// Advertised port.
    pub port: u16,
    /// Registry group.
    pub group: String,
}

impl ServiceInstance {
    /// Creates an instance identity.
    pub fn new(name: impl Into<String>, ip: IpAddr, port: u16, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip,
            port,
            group: group.into(),
        }
    }

    /// True if every identity field is usable (non-empty name and group, non-zero port).
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.group.trim().is_empty() && self.port != 0
    }

    /// Advertised socket address.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.name, self.group, self.addr())
    }
}

/// Local address the OS would use for outbound traffic, or `127.0.0.1`.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn local_ip() -> IpAddr {
    let discovered = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|sock| {
            sock.connect(ROUTE_PROBE_ADDR)?;
            sock.local_addr()
        })
        .map(|addr| addr.ip());

    match discovered {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            tracing::debug!(error = %e, "local address discovery failed; using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
