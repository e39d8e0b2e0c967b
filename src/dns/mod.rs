//! DNS Resolution Module
//!
//! Provides pluggable DNS resolution with multicast DNS for `.local` names:
//! - System resolver (getaddrinfo via thread pool)
//! - Async hickory-dns resolver (DoH/DoT capable)
//! - [`MdnsResolver`]: `.local` names over multicast DNS only
//! - [`DualMdnsResolver`]: `.local` names over multicast and conventional
//!   DNS at once, first success wins, simultaneous answers merged
//!
//! # Architecture
//!
//! The `Resolve` trait is the core abstraction. The mDNS resolvers
//! implement it and wrap another `Resolve` for everything outside `.local`,
//! so they slot in wherever a conventional resolver would. Multicast
//! traffic and the answer cache live behind the [`DiscoveryEngine`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use mdnsnet::dns::{AddressFamily, DualMdnsResolver, Name, Resolve};
//!
//! let resolver = DualMdnsResolver::new()?;
//! let records = resolver
//!     .resolve(Name::new("nas.local"), 445, AddressFamily::Unspecified)
//!     .await?;
//! for record in &records {
//!     println!("Resolved: {} -> {}", record.hostname, record.host);
//! }
//! resolver.close().await;
//! ```

mod config;
mod dual;
mod engine;
mod gai;
mod hickory;
mod mdns;
mod mdnssd;
mod query;
mod record;
mod resolve;

pub use config::{MdnsConfig, DEFAULT_QUERY_TIMEOUT};
pub use dual::DualMdnsResolver;
pub use engine::DiscoveryEngine;
pub use gai::GaiResolver;
pub use hickory::HickoryResolver;
pub use mdns::{MdnsResolver, MdnsResolverBuilder};
pub use mdnssd::{MdnsSdEngine, DEFAULT_CACHE_TTL};
pub use query::{fully_qualify, is_mdns_name, make_query, HostQuery, IpVersion};
pub use record::{AddressFamily, AddressRecord, AI_NUMERICHOST, AI_NUMERICSERV};
pub use resolve::{Closing, Name, Resolve, Resolving};
