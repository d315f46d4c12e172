//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (host, port, body limit).
    pub listener: ListenerConfig,

    /// Upstream server definitions.
    pub upstreams: Vec<UpstreamConfig>,

    /// Load balancing method.
    pub lb_method: LbMethod,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Outbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Failure-streak alerting.
    pub alerting: AlertConfig,

    /// Accepted for compatibility with existing config files; no behavior yet.
    pub self_healing: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,

    /// Maximum buffered upstream response body size in bytes.
    pub max_response_bytes: usize,
}

impl ListenerConfig {
    /// `host:port` form suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            max_response_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Upstream location (e.g., "http://127.0.0.1:3000").
    pub domain: String,

    /// Weight for weighted round-robin (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl UpstreamConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

fn default_weight() -> u32 {
    1
}

/// Supported selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LbMethod {
    Random,
    #[default]
    RoundRobin,
    IpHash,
    WeightedRoundRobin,
}

impl LbMethod {
    pub const ALL: [LbMethod; 4] = [
        LbMethod::Random,
        LbMethod::RoundRobin,
        LbMethod::IpHash,
        LbMethod::WeightedRoundRobin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LbMethod::Random => "random",
            LbMethod::RoundRobin => "round-robin",
            LbMethod::IpHash => "ip-hash",
            LbMethod::WeightedRoundRobin => "weighted-round-robin",
        }
    }
}

impl fmt::Display for LbMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported load balancing method '{0}', expected one of random, round-robin, ip-hash, weighted-round-robin")]
pub struct UnknownLbMethod(pub String);

impl FromStr for LbMethod {
    type Err = UnknownLbMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        LbMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| UnknownLbMethod(s.to_string()))
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Timeout configuration for proxied requests, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout.
    pub connect_secs: u64,

    /// Time allowed for the upstream to produce the response.
    pub read_secs: u64,

    /// Time allowed to transmit the request.
    pub send_secs: u64,

    /// Hard ceiling on a single attempt.
    pub next_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            read_secs: 5,
            send_secs: 5,
            next_secs: 5,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Number of consecutive failures before marking unhealthy.
    pub fails: u32,

    /// Number of consecutive successes before marking healthy.
    pub passes: u32,

    /// Pause between full probe rounds in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout for the startup screen in milliseconds.
    pub initial_timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            timeout_secs: 2,
            fails: 3,
            passes: 2,
            interval_secs: 10,
            initial_timeout_ms: 500,
        }
    }
}

/// Alert delivery on failure streaks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Webhook URL receiving a JSON POST; alerting is off when unset.
    pub webhook: Option<String>,

    /// Consecutive probe failures that trigger one alert.
    pub failure_streak: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            failure_streak: 3,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: BalancerConfig = toml::from_str(
            r#"
            [[upstreams]]
            domain = "http://127.0.0.1:9001"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstreams.len(), 1);
        assert_eq!(config.upstreams[0].weight, 1);
        assert_eq!(config.lb_method, LbMethod::RoundRobin);
        assert_eq!(config.retries.max_retries, 3);
        assert_eq!(config.health_check.path, "/health");
        assert_eq!(config.listener.bind_address(), "0.0.0.0:80");
    }

    #[test]
    fn test_lb_method_names() {
        let config: BalancerConfig = toml::from_str(r#"lb_method = "weighted-round-robin""#).unwrap();
        assert_eq!(config.lb_method, LbMethod::WeightedRoundRobin);

        assert!(toml::from_str::<BalancerConfig>(r#"lb_method = "least-conn""#).is_err());

        assert_eq!("IP-Hash".parse::<LbMethod>().unwrap(), LbMethod::IpHash);
        assert!("fastest".parse::<LbMethod>().is_err());
        for method in LbMethod::ALL {
            assert_eq!(method.as_str().parse::<LbMethod>().unwrap(), method);
        }
    }
}
