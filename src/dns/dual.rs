//! Dual-path resolution: multicast and conventional DNS raced together.
//!
//! A `.local` name that misses the mDNS cache is looked up two ways at
//! once, as separate tasks:
//!
//! - the multicast query (cache miss path of [`MdnsResolver`](super::MdnsResolver)),
//! - the conventional resolver, given the name as the caller wrote it.
//!
//! The first success ends the race. A failure never does: when the first
//! participant to finish failed, the other one is awaited. Whatever else has
//! already finished when the race is decided is merged in (mDNS answers
//! first, duplicates dropped); anything still running is cancelled and
//! awaited before returning.

use super::mdns::{cancellable, MdnsLookup, Prepared, ResolverBase};
use super::record::{AddressFamily, AddressRecord};
use super::resolve::{Closing, Name, Resolve, Resolving};
use crate::base::neterror::NetError;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

type Answer = Result<Vec<AddressRecord>, NetError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Mdns,
    Dns,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Path::Mdns => "mdns",
            Path::Dns => "dns",
        })
    }
}

/// One side of the race: a spawned lookup and, once observed, its answer.
///
/// The task is aborted if the participant is dropped, so abandoning the
/// race (e.g. the caller's future being dropped) never leaks a lookup.
struct Participant {
    path: Path,
    handle: AbortOnDropHandle<Answer>,
    answer: Option<Answer>,
}

impl Participant {
    fn spawn<F>(path: Path, lookup: F) -> Self
    where
        F: Future<Output = Answer> + Send + 'static,
    {
        Self {
            path,
            handle: AbortOnDropHandle::new(tokio::spawn(lookup)),
            answer: None,
        }
    }

    /// Waits until the lookup has finished and records its answer.
    ///
    /// Cancel safe: dropping this future loses nothing.
    async fn finish(&mut self) {
        if self.answer.is_none() {
            let joined = (&mut self.handle).await;
            self.answer = Some(self.flatten(joined));
        }
    }

    fn is_terminal(&self) -> bool {
        self.answer.is_some() || self.handle.is_finished()
    }

    fn failed(&self) -> bool {
        matches!(self.answer, Some(Err(_)))
    }

    fn flatten(&self, joined: Result<Answer, tokio::task::JoinError>) -> Answer {
        joined.unwrap_or_else(|e| {
            tracing::warn!(path = %self.path, error = %e, "resolution task failed");
            Err(NetError::TaskFailed(e.to_string()))
        })
    }

    /// Settles the participant at decision time.
    ///
    /// A participant that was terminal when the race was decided yields its
    /// answer. Anything else is aborted; the abort is awaited and its answer,
    /// if one slipped in meanwhile, discarded.
    async fn settle(mut self, terminal: bool) -> Option<Answer> {
        if terminal {
            self.finish().await;
            return self.answer;
        }
        if self.answer.is_some() {
            // Already observed; the handle is spent.
            return None;
        }
        self.handle.abort();
        match (&mut self.handle).await {
            Err(e) if e.is_cancelled() => {
                tracing::trace!(path = %self.path, "cancelled unfinished lookup");
            }
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, "task failed while being cancelled");
            }
            Ok(_) => {
                tracing::trace!(path = %self.path, "late answer discarded");
            }
        }
        None
    }
}

/// Accumulates answers in arrival order, dropping records already seen
/// (same hostname, port and host), and failures in the same order.
#[derive(Default)]
struct Merge {
    records: Vec<AddressRecord>,
    seen: HashSet<(String, u16, String)>,
    failures: Vec<NetError>,
}

impl Merge {
    fn add(&mut self, answer: Answer) {
        match answer {
            Ok(records) => {
                for record in records {
                    let (hostname, port, host) = record.dedup_key();
                    if self.seen.insert((hostname.to_string(), port, host.to_string())) {
                        self.records.push(record);
                    }
                }
            }
            Err(e) => self.failures.push(e),
        }
    }

    fn finish(self) -> Answer {
        if !self.records.is_empty() {
            return Ok(self.records);
        }
        let message = self
            .failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(NetError::CombinedLookupFailed(message))
    }
}

/// Races `lookup` against `dns` and merges the outcome.
async fn race(lookup: MdnsLookup, dns: Resolving, cancel: CancellationToken) -> Answer {
    let host = lookup.name().to_string();
    let mut mdns = Participant::spawn(Path::Mdns, lookup.run());
    let mut dns = Participant::spawn(Path::Dns, dns);

    let cancelled = tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = mdns.finish() => false,
        _ = dns.finish() => false,
    };
    if cancelled {
        return abandon(&host, mdns, dns).await;
    }

    // Only a success may end the race early.
    let pending = match (mdns.failed(), dns.failed()) {
        (true, _) if dns.answer.is_none() => Some(&mut dns),
        (_, true) if mdns.answer.is_none() => Some(&mut mdns),
        _ => None,
    };
    if let Some(pending) = pending {
        tracing::debug!(host = %host, waiting_on = %pending.path, "first lookup failed");
        let cancelled = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = pending.finish() => false,
        };
        if cancelled {
            return abandon(&host, mdns, dns).await;
        }
    }

    let (mdns_terminal, dns_terminal) = (mdns.is_terminal(), dns.is_terminal());
    let mut merge = Merge::default();
    if let Some(answer) = mdns.settle(mdns_terminal).await {
        merge.add(answer);
    }
    if let Some(answer) = dns.settle(dns_terminal).await {
        merge.add(answer);
    }

    if cancel.is_cancelled() {
        tracing::debug!(host = %host, "dual lookup cancelled by caller");
        return Err(NetError::Aborted);
    }
    let result = merge.finish();
    match &result {
        Ok(records) => tracing::debug!(
            host = %host,
            count = records.len(),
            mdns_terminal,
            dns_terminal,
            "dual lookup resolved"
        ),
        Err(e) => tracing::debug!(host = %host, error = %e, "dual lookup failed"),
    }
    result
}

/// Cancels both participants for a caller-initiated cancellation and waits
/// for them to stop.
async fn abandon(host: &str, mdns: Participant, dns: Participant) -> Answer {
    tracing::debug!(host = %host, "dual lookup cancelled by caller");
    mdns.settle(false).await;
    dns.settle(false).await;
    Err(NetError::Aborted)
}

/// Resolver answering `.local` names with mDNS and conventional DNS at once.
///
/// - Cached mDNS answers are returned without any network traffic.
/// - Otherwise the first successful lookup wins; answers that are already
///   in from the other lookup at that moment are merged in, mDNS first,
///   without duplicates.
/// - If both lookups fail, the error combines both messages.
///
/// Non-`.local` names go to the conventional resolver unmodified.
#[derive(Debug)]
pub struct DualMdnsResolver {
    base: ResolverBase,
}

impl DualMdnsResolver {
    /// Creates a resolver with its own discovery engine and the default
    /// conventional resolver.
    pub fn new() -> Result<Self, NetError> {
        super::MdnsResolverBuilder::new().build_dual()
    }

    pub(crate) fn from_base(base: ResolverBase) -> Self {
        Self { base }
    }

    /// Resolves `host` with port 0 and the IPv4 family.
    pub fn resolve_host(&self, host: impl Into<Name>) -> Resolving {
        self.resolve(host.into(), 0, AddressFamily::default())
    }

    /// Like [`resolve`](Resolve::resolve), but gives up with
    /// [`NetError::Aborted`] once `cancel` fires. In-flight lookups are
    /// cancelled and awaited first.
    pub fn resolve_with_cancel(
        &self,
        name: Name,
        port: u16,
        family: AddressFamily,
        cancel: &CancellationToken,
    ) -> Resolving {
        if let Some(resolving) = self.base.pass_through(&name, port, family) {
            return cancellable(resolving, cancel);
        }
        match self.base.prepare(&name, port, family) {
            Prepared::Settled(result) => Box::pin(std::future::ready(result)),
            Prepared::Query(lookup) => {
                let dns = self.base.inner().resolve(name, port, family);
                Box::pin(race(lookup, dns, cancel.clone()))
            }
        }
    }

    /// Whether [`close`](Resolve::close) will shut the discovery engine down.
    pub fn is_engine_owner(&self) -> bool {
        self.base.is_engine_owner()
    }

    /// Whether the resolver still holds a discovery engine (false after close).
    pub fn has_engine(&self) -> bool {
        self.base.has_engine()
    }

    pub fn config(&self) -> &super::MdnsConfig {
        self.base.config()
    }
}

impl Resolve for DualMdnsResolver {
    fn resolve(&self, name: Name, port: u16, family: AddressFamily) -> Resolving {
        self.resolve_with_cancel(name, port, family, &CancellationToken::new())
    }

    fn close(&self) -> Closing {
        self.base.close()
    }
}
