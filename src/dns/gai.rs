//! System DNS resolver using getaddrinfo.
//!
//! This resolver uses the operating system's native DNS resolution via
//! `getaddrinfo`, executed in a thread pool to avoid blocking the async runtime.
//!
//! # When to Use
//!
//! - When you need to respect system DNS configuration (/etc/resolv.conf, nsswitch)
//! - When DoH/DoT is not required
//! - As a fallback when hickory-dns is not available

use super::record::{AddressFamily, AddressRecord};
use super::resolve::{Name, Resolve, Resolving};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

/// System DNS resolver using `getaddrinfo` in a thread pool.
///
/// IP literals are answered directly without a lookup.
///
/// # Performance
///
/// Each resolution spawns a blocking task. For high-throughput scenarios,
/// consider using `HickoryResolver` which is fully async.
#[derive(Clone, Debug, Default)]
pub struct GaiResolver;

impl GaiResolver {
    /// Creates a new `GaiResolver`.
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, name: Name, port: u16, family: AddressFamily) -> Resolving {
        Box::pin(async move {
            let domain = name.as_str().to_string();

            let addrs = match domain.parse::<IpAddr>() {
                Ok(ip) => vec![SocketAddr::new(ip, port)],
                Err(_) => {
                    let host = domain.clone();
                    tokio::task::spawn_blocking(move || {
                        tracing::debug!(host = %host, "resolving via getaddrinfo");
                        (host.as_str(), port)
                            .to_socket_addrs()
                            .map(|iter| iter.collect::<Vec<_>>())
                    })
                    .await
                    // Handle task join error (cancellation, panic)
                    .map_err(|e| {
                        tracing::error!(error = %e, "DNS resolution task failed");
                        NetError::NameNotResolved
                    })?
                    .dns_context(&domain)?
                }
            };

            let records: Vec<AddressRecord> = addrs
                .into_iter()
                .filter(|addr| family.admits(&addr.ip()))
                .map(|addr| AddressRecord::from_ip(domain.as_str(), addr.port(), addr.ip()))
                .fold(Vec::new(), |mut acc, record| {
                    if !acc.contains(&record) {
                        acc.push(record);
                    }
                    acc
                });

            if records.is_empty() {
                return Err(NetError::dns_failed(
                    &domain,
                    "No addresses returned by getaddrinfo",
                ));
            }

            tracing::debug!(domain = %domain, count = records.len(), "DNS resolution complete");
            Ok(records)
        })
    }
}
