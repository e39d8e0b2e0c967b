//! Discovery engine backed by the `mdns-sd` daemon.
//!
//! The daemon runs on its own thread and reports hostname resolutions over
//! a channel, keeping a single listener per hostname. The engine therefore
//! runs at most one daemon search per hostname: concurrent lookups of the
//! same host subscribe to it, each bounded by its own timeout, and the last
//! one to leave stops it. Answers are kept in a small TTL cache so later
//! lookups for the same host can be served without going back to the
//! network.

use super::engine::DiscoveryEngine;
use super::query::HostQuery;
use crate::base::neterror::NetError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use mdns_sd::{HostnameResolutionEvent, Receiver, ServiceDaemon};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::task::AbortOnDropHandle;

/// Host record TTL recommended by RFC 6762 §10.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Events buffered per search. A waiter that falls further behind reloads
/// from the cache.
const SEARCH_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct CachedHost {
    addrs: Vec<IpAddr>,
    expires_at: Instant,
}

/// Answers learned from the daemon, keyed by lower-cased hostname.
#[derive(Debug)]
struct HostCache {
    entries: DashMap<String, CachedHost>,
    ttl: Duration,
}

impl HostCache {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adds `found` to the entry for `key` and restarts its TTL. Expired
    /// entries of every host are dropped first.
    fn remember(&self, key: &str, found: &HashSet<IpAddr>) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);

        let expires_at = now + self.ttl;
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CachedHost {
                addrs: Vec::new(),
                expires_at,
            });
        for ip in found {
            if !entry.addrs.contains(ip) {
                entry.addrs.push(*ip);
            }
        }
        entry.expires_at = expires_at;
    }

    fn forget(&self, key: &str, removed: &HashSet<IpAddr>) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.addrs.retain(|ip| !removed.contains(ip));
        }
        self.entries.remove_if(key, |_, entry| entry.addrs.is_empty());
    }

    /// Copies the live answers for `key` into `query`.
    fn load(&self, key: &str, query: &mut HostQuery) -> bool {
        let Some(entry) = self.entries.get(key).map(|e| e.value().clone()) else {
            return false;
        };
        if entry.expires_at <= Instant::now() {
            self.entries
                .remove_if(key, |_, entry| entry.expires_at <= Instant::now());
            return false;
        }
        for ip in entry.addrs {
            query.add_address(ip);
        }
        query.has_addresses()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// What a running search reports to the lookups waiting on it.
#[derive(Debug, Clone)]
enum SearchEvent {
    Found(Vec<IpAddr>),
    Removed(Vec<IpAddr>),
    Ended,
}

/// One daemon search, shared by every lookup of its hostname.
struct Search {
    events: broadcast::Sender<SearchEvent>,
    waiters: usize,
    pump: AbortOnDropHandle<()>,
}

/// A lookup's share of a running search. Dropping it leaves the search,
/// aborted lookups included.
struct SearchGuard<'a> {
    engine: &'a MdnsSdEngine,
    key: String,
    events: broadcast::Receiver<SearchEvent>,
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.engine.leave(&self.key);
    }
}

/// Forwards daemon events for one hostname into the cache and to the
/// search's waiters.
async fn pump_events(
    key: String,
    receiver: Receiver<HostnameResolutionEvent>,
    cache: Arc<HostCache>,
    events: broadcast::Sender<SearchEvent>,
) {
    while let Ok(event) = receiver.recv_async().await {
        let event = match event {
            HostnameResolutionEvent::AddressesFound(_, found) => {
                cache.remember(&key, &found);
                SearchEvent::Found(found.into_iter().collect())
            }
            HostnameResolutionEvent::AddressesRemoved(_, removed) => {
                cache.forget(&key, &removed);
                SearchEvent::Removed(removed.into_iter().collect())
            }
            HostnameResolutionEvent::SearchTimeout(_)
            | HostnameResolutionEvent::SearchStopped(_) => break,
            _ => continue,
        };
        // Nobody listening is fine: the cache has it.
        let _ = events.send(event);
    }
    tracing::trace!(host = %key, "mDNS search ended");
    let _ = events.send(SearchEvent::Ended);
}

/// [`DiscoveryEngine`] over an `mdns_sd::ServiceDaemon`.
pub struct MdnsSdEngine {
    daemon: ServiceDaemon,
    cache: Arc<HostCache>,
    searches: DashMap<String, Search>,
}

impl MdnsSdEngine {
    /// Starts a daemon with the default cache TTL.
    pub fn new() -> Result<Self, NetError> {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Starts a daemon whose answers stay cached for `ttl`.
    pub fn with_ttl(ttl: Duration) -> Result<Self, NetError> {
        let daemon = ServiceDaemon::new().map_err(|e| {
            tracing::warn!(error = %e, "failed to start mDNS daemon");
            NetError::DiscoveryEngine(e.to_string())
        })?;
        Ok(Self {
            daemon,
            cache: Arc::new(HostCache::new(ttl)),
            searches: DashMap::new(),
        })
    }

    /// Number of hosts currently cached.
    pub fn cached_host_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of hostnames with a daemon search in flight.
    pub fn active_searches(&self) -> usize {
        self.searches.len()
    }

    /// Joins the search for `key`, starting one if none is running.
    fn join(&self, key: &str) -> Result<SearchGuard<'_>, mdns_sd::Error> {
        let events = match self.searches.entry(key.to_string()) {
            Entry::Occupied(mut entry) if !entry.get().pump.is_finished() => {
                let search = entry.get_mut();
                search.waiters += 1;
                tracing::trace!(host = %key, waiters = search.waiters, "joined mDNS search");
                search.events.subscribe()
            }
            entry => {
                let mut search = self.start_search(key)?;
                let events = search.events.subscribe();
                match entry {
                    Entry::Occupied(mut stale) => {
                        // The old search died under its waiters; they keep their share.
                        search.waiters += stale.get().waiters;
                        stale.insert(search);
                    }
                    Entry::Vacant(vacant) => {
                        vacant.insert(search);
                    }
                }
                events
            }
        };
        Ok(SearchGuard {
            engine: self,
            key: key.to_string(),
            events,
        })
    }

    fn start_search(&self, key: &str) -> Result<Search, mdns_sd::Error> {
        // No daemon timeout: each waiter bounds its own wait.
        let receiver = self.daemon.resolve_hostname(key, None)?;
        let (events, _) = broadcast::channel(SEARCH_EVENT_CAPACITY);
        let pump = tokio::spawn(pump_events(
            key.to_string(),
            receiver,
            self.cache.clone(),
            events.clone(),
        ));
        tracing::debug!(host = %key, "started mDNS search");
        Ok(Search {
            events,
            waiters: 1,
            pump: AbortOnDropHandle::new(pump),
        })
    }

    /// Drops one waiter from the search for `key`, stopping the search when
    /// it was the last.
    fn leave(&self, key: &str) {
        let Entry::Occupied(mut entry) = self.searches.entry(key.to_string()) else {
            return;
        };
        let search = entry.get_mut();
        search.waiters = search.waiters.saturating_sub(1);
        if search.waiters > 0 {
            return;
        }
        // Still under the entry lock, so a new search cannot slip in between.
        if let Err(e) = self.daemon.stop_resolve_hostname(key) {
            tracing::trace!(host = %key, error = %e, "stop_resolve_hostname failed");
        }
        entry.remove();
        tracing::debug!(host = %key, "stopped mDNS search");
    }
}

fn cache_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl DiscoveryEngine for MdnsSdEngine {
    fn load_from_cache(&self, query: &mut HostQuery) -> bool {
        let key = cache_key(query.name());
        self.cache.load(&key, query)
    }

    fn request<'a>(&'a self, query: &'a mut HostQuery, timeout: Duration) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let key = cache_key(query.name());
            let mut guard = match self.join(&key) {
                Ok(guard) => guard,
                Err(e) => {
                    tracing::debug!(host = %key, error = %e, "mDNS request could not start");
                    return false;
                }
            };
            // Answers that reached the search before this lookup joined.
            if self.cache.load(&key, query) {
                return true;
            }

            let collect = async {
                loop {
                    match guard.events.recv().await {
                        Ok(SearchEvent::Found(found)) => {
                            for ip in found {
                                query.add_address(ip);
                            }
                            if query.has_addresses() {
                                return;
                            }
                        }
                        Ok(SearchEvent::Removed(removed)) => {
                            for ip in &removed {
                                query.remove_address(ip);
                            }
                        }
                        Ok(SearchEvent::Ended) | Err(RecvError::Closed) => return,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::trace!(host = %key, skipped, "mDNS waiter lagged");
                            if self.cache.load(&key, query) {
                                return;
                            }
                        }
                    }
                }
            };
            if tokio::time::timeout(timeout, collect).await.is_err() {
                tracing::trace!(host = %key, "mDNS request timed out");
            }

            drop(guard);
            query.has_addresses()
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.searches.clear();
            self.cache.clear();
            match self.daemon.shutdown() {
                Ok(status) => {
                    let _ = tokio::time::timeout(SHUTDOWN_GRACE, status.recv_async()).await;
                }
                Err(e) => tracing::warn!(error = %e, "mDNS daemon shutdown failed"),
            }
        })
    }
}

impl std::fmt::Debug for MdnsSdEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdnsSdEngine")
            .field("cached_hosts", &self.cache.len())
            .field("ttl", &self.cache.ttl)
            .field("active_searches", &self.searches.len())
            .finish_non_exhaustive()
    }
}
