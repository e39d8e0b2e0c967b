//! Per-lookup multicast query state.
//!
//! A [`HostQuery`] is built once per `.local` resolution by [`make_query`]
//! and filled either from the discovery engine's cache or by a timed
//! network request. It owns nothing but its own answers.

use super::record::{AddressFamily, AddressRecord};
use std::net::IpAddr;

const MDNS_SUFFIX: &str = ".local";

/// IP versions a query collects answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4Only,
    V6Only,
    All,
}

impl IpVersion {
    pub fn includes(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4Only => ip.is_ipv4(),
            IpVersion::V6Only => ip.is_ipv6(),
            IpVersion::All => true,
        }
    }
}

impl From<AddressFamily> for IpVersion {
    fn from(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Inet => IpVersion::V4Only,
            AddressFamily::Inet6 => IpVersion::V6Only,
            AddressFamily::Unspecified => IpVersion::All,
        }
    }
}

/// Returns true if `host` lives in the multicast namespace, i.e. ends in
/// `.local` or `.local.` (ASCII case-insensitive).
pub fn is_mdns_name(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    host.len()
        .checked_sub(MDNS_SUFFIX.len())
        .and_then(|start| host.get(start..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(MDNS_SUFFIX))
}

/// Appends the trailing root dot the multicast namespace requires.
pub fn fully_qualify(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{host}.")
    }
}

/// Builds the query for one resolution of `host`.
///
/// `family` picks the query's scope: `Unspecified` collects both IPv4 and
/// IPv6 answers, the other two a single version.
pub fn make_query(host: &str, port: u16, family: AddressFamily) -> HostQuery {
    let mut query = HostQuery::new(fully_qualify(host), IpVersion::from(family));
    query.port = Some(port);
    query
}

/// State of one multicast host lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostQuery {
    name: String,
    version: IpVersion,
    /// Host name the answers belong to.
    pub server: Option<String>,
    /// Port the answers are for, when known.
    pub port: Option<u16>,
    v4: Vec<IpAddr>,
    v6: Vec<IpAddr>,
}

impl HostQuery {
    /// `name` must already be fully qualified.
    pub fn new(name: impl Into<String>, version: IpVersion) -> Self {
        let name = name.into();
        Self {
            server: Some(name.clone()),
            name,
            version,
            port: None,
            v4: Vec::new(),
            v6: Vec::new(),
        }
    }

    /// The fully-qualified name being looked up.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    /// Records an answer. Addresses outside the query's scope and repeats
    /// are ignored; returns whether `ip` was added.
    pub fn add_address(&mut self, ip: IpAddr) -> bool {
        if !self.version.includes(&ip) {
            return false;
        }
        let bucket = if ip.is_ipv4() { &mut self.v4 } else { &mut self.v6 };
        if bucket.contains(&ip) {
            return false;
        }
        bucket.push(ip);
        true
    }

    /// Drops a previously recorded answer.
    pub fn remove_address(&mut self, ip: &IpAddr) {
        self.v4.retain(|a| a != ip);
        self.v6.retain(|a| a != ip);
    }

    /// Whether any in-scope answer has been recorded.
    pub fn has_addresses(&self) -> bool {
        !self.v4.is_empty() || !self.v6.is_empty()
    }

    /// Recorded answers for `version`, IPv4 before IPv6.
    pub fn ip_addresses_by_version(&self, version: IpVersion) -> Vec<IpAddr> {
        let v4 = self.v4.iter().filter(|_| version != IpVersion::V6Only);
        let v6 = self.v6.iter().filter(|_| version != IpVersion::V4Only);
        v4.chain(v6).copied().collect()
    }

    /// Maps the answers for `family` to records, using the learned server
    /// name and port.
    pub fn to_records(&self, family: AddressFamily) -> Vec<AddressRecord> {
        let hostname = self.server.as_deref().unwrap_or(&self.name);
        let port = self.port.unwrap_or(0);
        self.ip_addresses_by_version(IpVersion::from(family))
            .into_iter()
            .map(|ip| AddressRecord::from_ip(hostname, port, ip))
            .collect()
    }
}
