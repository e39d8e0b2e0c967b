//! Resolved address records.
//!
//! An [`AddressRecord`] is what the connection layer consumes: one concrete
//! IP address with the hostname and port it was resolved for, plus the
//! `getaddrinfo`-style metadata a socket layer expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// `AI_NUMERICHOST`: the host field is already a numeric address.
pub const AI_NUMERICHOST: i32 = 0x0004;
/// `AI_NUMERICSERV`: the port is already numeric.
pub const AI_NUMERICSERV: i32 = 0x0400;

const NUMERIC_FLAGS: i32 = AI_NUMERICHOST | AI_NUMERICSERV;

/// Socket address family requested from, or reported by, a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AddressFamily {
    /// Either family (`AF_UNSPEC`).
    Unspecified,
    /// IPv4 (`AF_INET`).
    #[default]
    Inet,
    /// IPv6 (`AF_INET6`).
    Inet6,
}

impl AddressFamily {
    /// The family an address belongs to.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::Inet,
            IpAddr::V6(_) => AddressFamily::Inet6,
        }
    }

    /// Whether `ip` is acceptable for a request made with this family.
    pub fn admits(&self, ip: &IpAddr) -> bool {
        match self {
            AddressFamily::Unspecified => true,
            AddressFamily::Inet => ip.is_ipv4(),
            AddressFamily::Inet6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressFamily::Unspecified => "AF_UNSPEC",
            AddressFamily::Inet => "AF_INET",
            AddressFamily::Inet6 => "AF_INET6",
        };
        f.write_str(name)
    }
}

/// One resolved address, ready to connect to.
///
/// Records are plain values: produced fresh per resolution and never
/// mutated afterwards. Two records describe the same endpoint when their
/// [`dedup_key`](AddressRecord::dedup_key) matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Name the address was resolved for.
    pub hostname: String,
    /// Canonical textual form of the IP address.
    pub host: String,
    pub port: u16,
    pub family: AddressFamily,
    /// Protocol number; 0 means unspecified.
    pub proto: i32,
    /// `AI_*` flags.
    pub flags: i32,
}

impl AddressRecord {
    /// Builds a record for an already-resolved address.
    ///
    /// The address and port are numeric, so the record carries
    /// `AI_NUMERICHOST | AI_NUMERICSERV` and no further lookup is needed
    /// downstream.
    pub fn from_ip(hostname: impl Into<String>, port: u16, ip: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            host: ip.to_string(),
            port,
            family: AddressFamily::of(&ip),
            proto: 0,
            flags: NUMERIC_FLAGS,
        }
    }

    /// Identity used when merging answers from several sources.
    pub fn dedup_key(&self) -> (&str, u16, &str) {
        (&self.hostname, self.port, &self.host)
    }

    /// The socket address this record points at, if `host` is numeric.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.host
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}
