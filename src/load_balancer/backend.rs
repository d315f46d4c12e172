//! Upstream server abstraction.
//!
//! # Responsibilities
//! - Represent a single configured upstream (identity, weight)
//! - Track health classification (Healthy/Unhealthy/Dead)
//! - Track served-request and failure counters
//!
//! Counters and classification are atomics so that writes from the health
//! engine and request handlers are visible to every reader immediately.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::config::UpstreamConfig;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy = 1,
    Unhealthy = 2,
    /// Reserved; nothing assigns it today.
    Dead = 3,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            3 => HealthState::Dead,
            _ => HealthState::Unhealthy,
        }
    }
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Dead => "dead",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an upstream location that cannot be turned into host + port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUpstream {
    #[error("'{domain}' is not a valid URL ({reason}), expected http://host:port")]
    Url { domain: String, reason: String },

    #[error("'{0}' has no host")]
    MissingHost(String),

    #[error("'{0}' has no port and its scheme has no default")]
    MissingPort(String),
}

/// Identity of an upstream: host + port.
///
/// Used as the key of the healthy set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpstreamId {
    pub host: String,
    pub port: u16,
}

impl UpstreamId {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Extract host and port from a configured domain such as `http://10.0.0.2:8080`.
    pub fn parse(domain: &str) -> Result<Self, InvalidUpstream> {
        let url = url::Url::parse(domain.trim()).map_err(|e| InvalidUpstream::Url {
            domain: domain.to_string(),
            reason: e.to_string(),
        })?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| InvalidUpstream::MissingHost(domain.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| InvalidUpstream::MissingPort(domain.to_string()))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for UpstreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A single upstream server.
#[derive(Debug)]
pub struct Upstream {
    /// Host + port identity.
    pub id: UpstreamId,
    /// Pre-calculated base URL (`http://{host}:{port}`), no trailing slash.
    url: String,
    /// Configured weight, consumed by weighted round-robin.
    pub weight: u32,

    /// Current health state (1=Healthy, 2=Unhealthy, 3=Dead).
    state: AtomicU8,
    /// Requests answered with 200 through this upstream.
    requests_served: AtomicU64,
    /// Healthy → unhealthy transitions.
    failures: AtomicU64,
}

impl Upstream {
    /// Create a new upstream, initially unhealthy.
    pub fn new(id: UpstreamId, weight: u32) -> Self {
        let url = format!("http://{}", id);
        Self {
            id,
            url,
            weight: weight.max(1),
            state: AtomicU8::new(HealthState::Unhealthy as u8),
            requests_served: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, InvalidUpstream> {
        Ok(Self::new(UpstreamId::parse(&config.domain)?, config.weight))
    }

    /// Base URL without trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    pub fn set_health(&self, state: HealthState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    pub fn record_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}
