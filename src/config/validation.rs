//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate upstream locations and reject duplicates
//! - Validate value ranges (thresholds >= 1, timeouts bounded, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::BalancerConfig;
use crate::load_balancer::backend::UpstreamId;

const MAX_TIMEOUT_SECS: u64 = 10_000;
const MAX_PROBE_TIMEOUT_SECS: u64 = 10;
const MAX_INTERVAL_SECS: u64 = 300;
const MAX_ALERT_STREAK: u32 = 100;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a deserialized config for semantic errors.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::new("listener.port", "must be non-zero"));
    }
    if config.listener.max_response_bytes == 0 {
        errors.push(ValidationError::new("listener.max_response_bytes", "must be at least 1"));
    }

    if config.upstreams.is_empty() {
        errors.push(ValidationError::new("upstreams", "at least one upstream is required"));
    }

    let mut seen = HashSet::new();
    for (i, upstream) in config.upstreams.iter().enumerate() {
        let field = format!("upstreams[{}]", i);
        match UpstreamId::parse(&upstream.domain) {
            Ok(id) => {
                if !seen.insert(id.clone()) {
                    errors.push(ValidationError::new(field.clone(), format!("duplicate upstream {}", id)));
                }
            }
            Err(e) => errors.push(ValidationError::new(field.clone(), e.to_string())),
        }
        if upstream.weight < 1 {
            errors.push(ValidationError::new(format!("{}.weight", field), "must be at least 1"));
        }
    }

    let hc = &config.health_check;
    if !hc.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }
    if hc.fails < 1 {
        errors.push(ValidationError::new("health_check.fails", "must be at least 1"));
    }
    if hc.passes < 1 {
        errors.push(ValidationError::new("health_check.passes", "must be at least 1"));
    }
    if !(1..=MAX_PROBE_TIMEOUT_SECS).contains(&hc.timeout_secs) {
        errors.push(ValidationError::new(
            "health_check.timeout_secs",
            format!("must be between 1 and {}", MAX_PROBE_TIMEOUT_SECS),
        ));
    }
    if !(1..=MAX_INTERVAL_SECS).contains(&hc.interval_secs) {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            format!("must be between 1 and {}", MAX_INTERVAL_SECS),
        ));
    }

    let t = &config.timeouts;
    for (name, value) in [
        ("timeouts.connect_secs", t.connect_secs),
        ("timeouts.read_secs", t.read_secs),
        ("timeouts.send_secs", t.send_secs),
        ("timeouts.next_secs", t.next_secs),
    ] {
        if value > MAX_TIMEOUT_SECS {
            errors.push(ValidationError::new(name, format!("must be at most {}", MAX_TIMEOUT_SECS)));
        }
    }

    let streak = config.alerting.failure_streak;
    if !(1..=MAX_ALERT_STREAK).contains(&streak) {
        errors.push(ValidationError::new(
            "alerting.failure_streak",
            format!("must be between 1 and {}", MAX_ALERT_STREAK),
        ));
    }
    if let Some(webhook) = &config.alerting.webhook {
        if url::Url::parse(webhook).is_err() {
            errors.push(ValidationError::new("alerting.webhook", "not a valid URL"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
