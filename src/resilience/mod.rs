//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce connect/send/read/attempt deadlines)
//!     → On failure: retries.rs (classify outcome, check attempt budget)
//!     → routing engine reselects an upstream and tries again
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - Failover instead of backoff: a retry targets a different upstream
//! - Health classification is left to the health engine

pub mod retries;
pub mod timeouts;

pub use retries::{classify_status, AttemptOutcome, RetryPolicy};
pub use timeouts::UpstreamTimeouts;
