//! Retry logic.
//!
//! # Responsibilities
//! - Classify an attempt outcome as success, retryable, or final
//! - Bound total attempts to `max_retries + 1`
//!
//! # Design Decisions
//! - Only 200 counts as success
//! - 500/502/503/504 and transport errors are retried on another upstream
//! - Every other status is handed back to the client unchanged
//! - No backoff between attempts; the next attempt goes to a different upstream

use axum::http::StatusCode;

use crate::config::RetryConfig;

/// What to do with one attempt's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retry,
    PassThrough,
}

/// Classify an upstream status code.
pub fn classify_status(status: StatusCode) -> AttemptOutcome {
    if status == StatusCode::OK {
        AttemptOutcome::Success
    } else if is_retryable_status(status) {
        AttemptOutcome::Retry
    } else {
        AttemptOutcome::PassThrough
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

/// Attempt budget for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
        }
    }
}
