//! Multicast DNS resolution for `.local` names.
//!
//! [`MdnsResolver`] answers `.local` names from a [`DiscoveryEngine`] and
//! hands every other name to a conventional resolver untouched. The lookup
//! is cache first, then one timed multicast request.
//!
//! # Example
//!
//! ```rust,ignore
//! use mdnsnet::dns::{AddressFamily, MdnsResolver, Name, Resolve};
//!
//! let resolver = MdnsResolver::new()?;
//! let records = resolver
//!     .resolve(Name::new("printer.local"), 631, AddressFamily::Unspecified)
//!     .await?;
//! resolver.close().await;
//! ```

use super::config::MdnsConfig;
use super::dual::DualMdnsResolver;
use super::engine::DiscoveryEngine;
use super::hickory::HickoryResolver;
use super::mdnssd::MdnsSdEngine;
use super::query::{is_mdns_name, make_query, HostQuery};
use super::record::{AddressFamily, AddressRecord};
use super::resolve::{Closing, Name, Resolve, Resolving};
use crate::base::neterror::NetError;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wraps `resolving` so it gives up with [`NetError::Aborted`] once `cancel`
/// fires. Dropping the inner future cancels whatever it was doing.
pub(crate) fn cancellable(resolving: Resolving, cancel: &CancellationToken) -> Resolving {
    let cancel = cancel.clone();
    Box::pin(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NetError::Aborted),
            result = resolving => result,
        }
    })
}

/// A `.local` lookup that missed the cache and still has to query.
pub(crate) struct MdnsLookup {
    engine: Arc<dyn DiscoveryEngine>,
    query: HostQuery,
    family: AddressFamily,
    timeout: Option<Duration>,
}

impl MdnsLookup {
    pub(crate) fn name(&self) -> &str {
        self.query.name()
    }

    /// Queries the engine (unless querying is disabled) and maps whatever the
    /// query collected.
    pub(crate) async fn run(mut self) -> Result<Vec<AddressRecord>, NetError> {
        match self.timeout {
            Some(timeout) => {
                tracing::debug!(host = %self.query.name(), ?timeout, "sending mDNS query");
                let answered = self.engine.request(&mut self.query, timeout).await;
                tracing::debug!(host = %self.query.name(), answered, "mDNS query finished");
            }
            None => {
                tracing::debug!(host = %self.query.name(), "mDNS querying disabled");
            }
        }
        addresses_from_query(&self.query, self.family)
    }
}

/// Maps the query's answers for `family`, failing when there are none.
fn addresses_from_query(
    query: &HostQuery,
    family: AddressFamily,
) -> Result<Vec<AddressRecord>, NetError> {
    let records = query.to_records(family);
    if records.is_empty() {
        return Err(NetError::MdnsLookupFailed);
    }
    Ok(records)
}

/// How a `.local` lookup proceeds after the cache probe.
pub(crate) enum Prepared {
    /// The cache answered (or the lookup failed outright).
    Settled(Result<Vec<AddressRecord>, NetError>),
    /// The cache missed; the lookup needs the network.
    Query(MdnsLookup),
}

/// State shared by both mDNS resolver variants: the conventional resolver,
/// the discovery engine handle and whether this resolver owns it.
pub(crate) struct ResolverBase {
    inner: Arc<dyn Resolve>,
    engine: Mutex<Option<Arc<dyn DiscoveryEngine>>>,
    engine_owner: bool,
    config: MdnsConfig,
}

impl ResolverBase {
    pub(crate) fn inner(&self) -> &Arc<dyn Resolve> {
        &self.inner
    }

    pub(crate) fn config(&self) -> &MdnsConfig {
        &self.config
    }

    pub(crate) fn is_engine_owner(&self) -> bool {
        self.engine_owner
    }

    pub(crate) fn has_engine(&self) -> bool {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn engine(&self) -> Result<Arc<dyn DiscoveryEngine>, NetError> {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(NetError::ResolverClosed)
    }

    /// Hands a non-`.local` name to the conventional resolver, or returns
    /// `None` for names this resolver must answer itself.
    pub(crate) fn pass_through(
        &self,
        name: &Name,
        port: u16,
        family: AddressFamily,
    ) -> Option<Resolving> {
        if is_mdns_name(name.as_str()) {
            return None;
        }
        tracing::debug!(host = %name, %family, "not a .local name, using conventional DNS");
        Some(self.inner.resolve(name.clone(), port, family))
    }

    /// Builds the query for `name` and probes the engine's cache.
    pub(crate) fn prepare(&self, name: &Name, port: u16, family: AddressFamily) -> Prepared {
        let engine = match self.engine() {
            Ok(engine) => engine,
            Err(e) => return Prepared::Settled(Err(e)),
        };
        let mut query = make_query(name.as_str(), port, family);
        if engine.load_from_cache(&mut query) {
            tracing::debug!(host = %query.name(), %family, "mDNS cache hit");
            return Prepared::Settled(addresses_from_query(&query, family));
        }
        Prepared::Query(MdnsLookup {
            engine,
            query,
            family,
            timeout: self.config.effective_query_timeout(),
        })
    }

    /// Closes the engine if it is ours, then the conventional resolver. The
    /// engine reference is dropped either way.
    pub(crate) fn close(&self) -> Closing {
        let engine = self
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let owned = self.engine_owner;
        let inner = self.inner.clone();
        Box::pin(async move {
            if let Some(engine) = engine.filter(|_| owned) {
                tracing::debug!("closing owned discovery engine");
                engine.close().await;
            }
            inner.close().await;
        })
    }
}

impl fmt::Debug for ResolverBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBase")
            .field("engine_owner", &self.engine_owner)
            .field("has_engine", &self.has_engine())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Resolver answering `.local` names over multicast DNS only.
///
/// Other names go to the wrapped conventional resolver unmodified. A
/// `.local` name that the cache cannot answer costs one multicast request
/// bounded by [`MdnsConfig::query_timeout`]; if that yields nothing the
/// lookup fails with [`NetError::MdnsLookupFailed`].
#[derive(Debug)]
pub struct MdnsResolver {
    base: ResolverBase,
}

impl MdnsResolver {
    /// Creates a resolver with its own discovery engine and the default
    /// conventional resolver.
    pub fn new() -> Result<Self, NetError> {
        MdnsResolverBuilder::new().build()
    }

    pub fn builder() -> MdnsResolverBuilder {
        MdnsResolverBuilder::new()
    }

    /// Resolves `host` with port 0 and the IPv4 family.
    pub fn resolve_host(&self, host: impl Into<Name>) -> Resolving {
        self.resolve(host.into(), 0, AddressFamily::default())
    }

    /// Like [`resolve`](Resolve::resolve), but gives up with
    /// [`NetError::Aborted`] once `cancel` fires. An in-flight query is
    /// dropped, which releases it.
    pub fn resolve_with_cancel(
        &self,
        name: Name,
        port: u16,
        family: AddressFamily,
        cancel: &CancellationToken,
    ) -> Resolving {
        cancellable(self.resolve(name, port, family), cancel)
    }

    /// Whether [`close`](Resolve::close) will shut the discovery engine down.
    pub fn is_engine_owner(&self) -> bool {
        self.base.is_engine_owner()
    }

    /// Whether the resolver still holds a discovery engine (false after close).
    pub fn has_engine(&self) -> bool {
        self.base.has_engine()
    }

    pub fn config(&self) -> &MdnsConfig {
        self.base.config()
    }
}

impl Resolve for MdnsResolver {
    fn resolve(&self, name: Name, port: u16, family: AddressFamily) -> Resolving {
        if let Some(resolving) = self.base.pass_through(&name, port, family) {
            return resolving;
        }
        match self.base.prepare(&name, port, family) {
            Prepared::Settled(result) => Box::pin(std::future::ready(result)),
            Prepared::Query(lookup) => Box::pin(lookup.run()),
        }
    }

    fn close(&self) -> Closing {
        self.base.close()
    }
}

enum EngineSource {
    /// Caller keeps ownership and closes it.
    Shared(Arc<dyn DiscoveryEngine>),
    /// Ownership passes to the resolver.
    Owned(Arc<dyn DiscoveryEngine>),
}

/// Builder for [`MdnsResolver`] and [`DualMdnsResolver`].
///
/// # Example
///
/// ```rust,ignore
/// let engine = Arc::new(MdnsSdEngine::new()?);
/// let resolver = MdnsResolverBuilder::new()
///     .shared_engine(engine.clone())
///     .query_timeout(Duration::from_millis(500))
///     .build_dual()?;
/// ```
#[derive(Default)]
pub struct MdnsResolverBuilder {
    resolver: Option<Arc<dyn Resolve>>,
    engine: Option<EngineSource>,
    config: MdnsConfig,
}

impl MdnsResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conventional resolver for non-`.local` names (and the DNS side of a
    /// dual lookup). Defaults to [`HickoryResolver`].
    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use an engine the caller owns. The resolver never closes it.
    pub fn shared_engine(mut self, engine: Arc<dyn DiscoveryEngine>) -> Self {
        self.engine = Some(EngineSource::Shared(engine));
        self
    }

    /// Hand an engine to the resolver, which closes it on close.
    pub fn owned_engine(mut self, engine: Arc<dyn DiscoveryEngine>) -> Self {
        self.engine = Some(EngineSource::Owned(engine));
        self
    }

    pub fn config(mut self, config: MdnsConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the multicast query timeout. Zero disables querying.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.query_timeout(timeout);
        self
    }

    /// Answer `.local` names from the cache only.
    pub fn disable_query(mut self) -> Self {
        self.config = self.config.disable_query();
        self
    }

    pub fn build(self) -> Result<MdnsResolver, NetError> {
        Ok(MdnsResolver {
            base: self.into_base()?,
        })
    }

    pub fn build_dual(self) -> Result<DualMdnsResolver, NetError> {
        Ok(DualMdnsResolver::from_base(self.into_base()?))
    }

    fn into_base(self) -> Result<ResolverBase, NetError> {
        let (engine, engine_owner) = match self.engine {
            Some(EngineSource::Shared(engine)) => (engine, false),
            Some(EngineSource::Owned(engine)) => (engine, true),
            None => {
                let engine: Arc<dyn DiscoveryEngine> = Arc::new(MdnsSdEngine::new()?);
                (engine, true)
            }
        };
        let inner = self
            .resolver
            .unwrap_or_else(|| Arc::new(HickoryResolver::new()));
        Ok(ResolverBase {
            inner,
            engine: Mutex::new(Some(engine)),
            engine_owner,
            config: self.config,
        })
    }
}

impl fmt::Debug for MdnsResolverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = match self.engine {
            Some(EngineSource::Shared(_)) => "shared",
            Some(EngineSource::Owned(_)) => "owned",
            None => "default",
        };
        f.debug_struct("MdnsResolverBuilder")
            .field("has_resolver", &self.resolver.is_some())
            .field("engine", &engine)
            .field("config", &self.config)
            .finish()
    }
}
