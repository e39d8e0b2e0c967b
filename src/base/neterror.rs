use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Resolution Errors
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Name {domain} not resolved: {reason}")]
    NameNotResolvedFor { domain: String, reason: String },
    #[error("MDNS lookup failed")]
    MdnsLookupFailed,
    /// Every participant of a dual lookup failed. The message lists each
    /// failure, mDNS first, joined by `", "`.
    #[error("{0}")]
    CombinedLookupFailed(String),

    // Lifecycle Errors
    #[error("Operation aborted")]
    Aborted,
    #[error("Resolver closed")]
    ResolverClosed,
    #[error("Discovery engine error: {0}")]
    DiscoveryEngine(String),
    #[error("Resolution task failed: {0}")]
    TaskFailed(String),

    #[error("Unknown error ({0})")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Aborted => -3,
            NetError::NameNotResolved => -105,
            NetError::NameNotResolvedFor { .. } => -105,

            // Custom codes, kept clear of Chromium's ranges
            NetError::MdnsLookupFailed => -10100,
            NetError::CombinedLookupFailed(_) => -10101,
            NetError::ResolverClosed => -10102,
            NetError::DiscoveryEngine(_) => -10103,
            NetError::TaskFailed(_) => -10104,

            NetError::Unknown(code) => *code,
        }
    }

    /// Builds a resolution failure for `domain` from any displayable cause.
    pub fn dns_failed(domain: &str, cause: impl std::fmt::Display) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            reason: cause.to_string(),
        }
    }

    /// Whether this error reports a missing answer rather than a lifecycle
    /// problem (closed resolver, cancellation).
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            NetError::NameNotResolved
                | NetError::NameNotResolvedFor { .. }
                | NetError::MdnsLookupFailed
                | NetError::CombinedLookupFailed(_)
        )
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -3 => NetError::Aborted,
            -105 => NetError::NameNotResolved,
            -10100 => NetError::MdnsLookupFailed,
            -10102 => NetError::ResolverClosed,
            _ => NetError::Unknown(code),
        }
    }
}
