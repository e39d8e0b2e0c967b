//! Async DNS resolver using hickory-dns.
//!
//! This resolver provides fully async DNS resolution with support for:
//! - DNS-over-HTTPS (DoH)
//! - DNS-over-TLS (DoT)
//! - System DNS configuration auto-detection
//! - IPv4 + IPv6 lookup, narrowed to the requested family
//!
//! It is the default conventional resolver behind the mDNS resolvers.

use super::record::{AddressFamily, AddressRecord};
use super::resolve::{Name, Resolve, Resolving};
use crate::base::neterror::NetError;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use std::sync::LazyLock;

/// Async DNS resolver backed by hickory-dns.
///
/// This resolver is lazily initialized on first use and shared across
/// all instances via a static `LazyLock`. It automatically configures
/// itself based on the system's DNS settings.
///
/// # Example
///
/// ```rust,ignore
/// use mdnsnet::dns::{AddressFamily, HickoryResolver, Name, Resolve};
///
/// let resolver = HickoryResolver::new();
/// let records = resolver.resolve(Name::new("example.com"), 443, AddressFamily::Inet).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    resolver: &'static LazyLock<TokioResolver>,
}

impl HickoryResolver {
    /// Creates a new `HickoryResolver`.
    ///
    /// The underlying resolver is lazily initialized on first DNS query.
    /// It will attempt to read system DNS configuration; if that fails,
    /// it falls back to sensible defaults.
    pub fn new() -> Self {
        static RESOLVER: LazyLock<TokioResolver> = LazyLock::new(|| {
            let mut builder = match TokioResolver::builder_tokio() {
                Ok(builder) => {
                    tracing::debug!("Using system DNS configuration");
                    builder
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Failed to read system DNS config, using defaults"
                    );
                    TokioResolver::builder_with_config(
                        ResolverConfig::default(),
                        TokioConnectionProvider::default(),
                    )
                }
            };

            // Both families; callers narrow per request
            builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

            builder.build()
        });

        Self {
            resolver: &RESOLVER,
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, name: Name, port: u16, family: AddressFamily) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let domain = name.as_str();
            tracing::debug!(domain = %domain, %family, "resolving via hickory-dns");

            let lookup = resolver
                .resolver
                .lookup_ip(domain)
                .await
                .map_err(|e| {
                    tracing::debug!(domain = %domain, error = %e, "hickory-dns lookup failed");
                    NetError::dns_failed(domain, e)
                })?;

            let records: Vec<AddressRecord> = lookup
                .iter()
                .filter(|ip| family.admits(ip))
                .map(|ip| AddressRecord::from_ip(domain, port, ip))
                .collect();

            if records.is_empty() {
                return Err(NetError::dns_failed(domain, "No addresses returned"));
            }

            tracing::debug!(domain = %domain, count = records.len(), "hickory-dns resolution complete");
            Ok(records)
        })
    }
}
