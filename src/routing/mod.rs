//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (buffered)
//!     → engine.rs select (healthy snapshot + active method)
//!     → outbound client attempt
//!     → 200: count and return
//!     → 5xx / transport error: failover reselect, bounded by max_retries
//!     → other status: returned unchanged
//! ```
//!
//! # Design Decisions
//! - Only healthy upstreams are ever contacted
//! - Failover reselections never use IP-hash, so a retry cannot land on the
//!   same sticky upstream again
//! - Failures surface as [`ProxyError`] with a JSON detail body

pub mod engine;
pub mod error;

pub use engine::{ProxiedRequest, ProxyEngine, RetryContext};
pub use error::ProxyError;
