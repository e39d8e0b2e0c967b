//! Core DNS resolution types and traits.
//!
//! This module defines the `Resolve` trait and supporting types that form
//! the foundation of the DNS abstraction layer.

use super::record::{AddressFamily, AddressRecord};
use crate::base::neterror::NetError;
use std::{fmt, future::Future, pin::Pin, sync::Arc};

/// A domain name to resolve into IP addresses.
///
/// This is a lightweight wrapper around a hostname string that provides
/// a type-safe way to pass domain names to resolvers.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Alias for the `Future` type returned by a DNS resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Vec<AddressRecord>, NetError>> + Send>>;

/// Alias for the `Future` type returned when a resolver releases its resources.
pub type Closing = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Trait for DNS resolution.
///
/// This is the interface the connection layer resolves through. The
/// conventional resolvers and the mDNS resolvers all implement it, so one
/// can wrap another.
///
/// # Design Notes
///
/// - Uses `&self` for concurrent resolution without mutable access.
/// - Returns boxed `'static` futures so callers may spawn them.
pub trait Resolve: Send + Sync {
    /// Resolves `name` to address records for `port`, restricted to `family`.
    fn resolve(&self, name: Name, port: u16, family: AddressFamily) -> Resolving;

    /// Releases resources held by the resolver.
    fn close(&self) -> Closing {
        Box::pin(std::future::ready(()))
    }
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name, port: u16, family: AddressFamily) -> Resolving {
        (**self).resolve(name, port, family)
    }

    fn close(&self) -> Closing {
        (**self).close()
    }
}
