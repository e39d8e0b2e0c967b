//! mDNS resolver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Query timeout applied when the caller does not choose one.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by both mDNS resolver variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdnsConfig {
    /// How long a multicast query may run. `None` or zero disables
    /// querying: `.local` names are then answered from the cache or fail.
    pub query_timeout: Option<Duration>,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            query_timeout: Some(DEFAULT_QUERY_TIMEOUT),
        }
    }
}

impl MdnsConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the multicast query timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Never query the network; only cached answers are used.
    pub fn disable_query(mut self) -> Self {
        self.query_timeout = None;
        self
    }

    /// The timeout to query with, or `None` when querying is disabled.
    pub fn effective_query_timeout(&self) -> Option<Duration> {
        self.query_timeout.filter(|t| !t.is_zero())
    }

    /// The effective timeout in whole milliseconds, for engines that take one.
    pub fn query_timeout_millis(&self) -> Option<u64> {
        self.effective_query_timeout()
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
    }
}
