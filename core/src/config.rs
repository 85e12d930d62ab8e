//! Client configuration.
//!
//! Deserializable so a host application can embed it in its own settings
//! file. The library itself reads no environment variables.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address of the notification service, e.g. `http://notifications:8080`.
    pub endpoint: Option<String>,

    /// Overall per-request timeout in milliseconds, handed to the transport.
    /// `None` or `0` leaves the transport's own behaviour in place.
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            timeout_ms: None,
        }
    }

    /// Sub-millisecond remainders round up so a non-zero timeout never
    /// collapses to zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 && !timeout.is_zero() {
            ms = 1;
        }
        self.timeout_ms = Some(ms);
        self
    }

    /// A zero timeout would fail every request immediately, so it counts as
    /// unset.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}
