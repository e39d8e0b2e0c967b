//! Discovery engine abstraction.
//!
//! The mDNS resolvers never speak the multicast protocol themselves. They
//! drive a [`DiscoveryEngine`], which owns the sockets and the record
//! cache, through three calls: a synchronous cache probe, a single timed
//! request, and shutdown.

use super::query::HostQuery;
use futures::future::BoxFuture;
use std::time::Duration;

/// A multicast discovery engine that [`HostQuery`]s are answered from.
///
/// Implementations must be safe to share between concurrent lookups; each
/// lookup brings its own `HostQuery`.
pub trait DiscoveryEngine: Send + Sync {
    /// Fills `query` from cached records without touching the network.
    ///
    /// Returns true when the cache held answers in the query's scope.
    fn load_from_cache(&self, query: &mut HostQuery) -> bool;

    /// Sends one multicast request and collects answers into `query` until
    /// one arrives or `timeout` elapses.
    ///
    /// Returns true when the query now holds answers. Not retried.
    fn request<'a>(&'a self, query: &'a mut HostQuery, timeout: Duration) -> BoxFuture<'a, bool>;

    /// Shuts the engine down.
    fn close(&self) -> BoxFuture<'_, ()>;
}
