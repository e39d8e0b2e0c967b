//! # mdnsnet
//!
//! Host resolution for `.local` names over multicast DNS, for async
//! networking stacks.
//!
//! `mdnsnet` plugs into a connection layer through the [`dns::Resolve`]
//! trait. Names under `.local` are answered by a multicast discovery engine
//! (cache first, then one timed query); every other name is handed to a
//! conventional resolver unchanged.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mdnsnet::dns::{AddressFamily, MdnsResolver, Name, Resolve};
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolver = MdnsResolver::new().unwrap();
//!     let records = resolver
//!         .resolve(Name::new("printer.local"), 631, AddressFamily::Unspecified)
//!         .await
//!         .unwrap();
//!     println!("{} -> {}", records[0].hostname, records[0].host);
//!     resolver.close().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and context helpers
//! - [`dns`] - Resolver trait, conventional and mDNS resolvers
//!
//! ## Resolver variants
//!
//! - [`dns::MdnsResolver`] answers `.local` names from mDNS alone.
//! - [`dns::DualMdnsResolver`] races mDNS against conventional DNS for
//!   `.local` names and merges answers that arrive together.

pub mod base;
pub mod dns;
