//! Mock discovery engine and conventional resolver shared by the
//! resolver tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use mdnsnet::base::neterror::NetError;
use mdnsnet::dns::{
    AddressFamily, AddressRecord, Closing, DiscoveryEngine, HostQuery, Name, Resolve, Resolving,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn ip(text: &str) -> IpAddr {
    text.parse().unwrap()
}

/// Discovery engine answering from fixed lists.
#[derive(Default)]
pub struct MockEngine {
    cached: Vec<IpAddr>,
    answers: Vec<IpAddr>,
    delay: Duration,
    learned_port: Option<u16>,
    pub cache_probes: AtomicUsize,
    pub requests: AtomicUsize,
    pub completed: AtomicUsize,
    pub closed: AtomicBool,
    pub last_timeout: Mutex<Option<Duration>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses the cache holds.
    pub fn with_cache(mut self, ips: &[&str]) -> Self {
        self.cached = ips.iter().map(|s| ip(s)).collect();
        self
    }

    /// Addresses a request discovers.
    pub fn with_answers(mut self, ips: &[&str]) -> Self {
        self.answers = ips.iter().map(|s| ip(s)).collect();
        self
    }

    /// How long a request takes before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Port a request learns for the host.
    pub fn with_port(mut self, port: u16) -> Self {
        self.learned_port = Some(port);
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl DiscoveryEngine for MockEngine {
    fn load_from_cache(&self, query: &mut HostQuery) -> bool {
        self.cache_probes.fetch_add(1, Ordering::SeqCst);
        for ip in &self.cached {
            query.add_address(*ip);
        }
        query.has_addresses()
    }

    fn request<'a>(&'a self, query: &'a mut HostQuery, timeout: Duration) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.requests.fetch_add(1, Ordering::SeqCst);
            *self.last_timeout.lock().unwrap() = Some(timeout);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(port) = self.learned_port {
                query.port = Some(port);
            }
            for ip in &self.answers {
                query.add_address(*ip);
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            query.has_addresses()
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
        })
    }
}

/// Conventional resolver returning a fixed outcome.
pub struct MockDns {
    outcome: Result<Vec<AddressRecord>, NetError>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub closed: AtomicBool,
    pub last_name: Mutex<Option<String>>,
}

impl MockDns {
    pub fn answering(records: Vec<AddressRecord>) -> Self {
        Self::with_outcome(Ok(records))
    }

    pub fn failing(error: NetError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<Vec<AddressRecord>, NetError>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            last_name: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Resolve for MockDns {
    fn resolve(&self, name: Name, _port: u16, _family: AddressFamily) -> Resolving {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_name.lock().unwrap() = Some(name.to_string());
        let outcome = self.outcome.clone();
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }

    fn close(&self) -> Closing {
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(std::future::ready(()))
    }
}

pub fn record(hostname: &str, host: &str, port: u16) -> AddressRecord {
    AddressRecord::from_ip(hostname, port, ip(host))
}
