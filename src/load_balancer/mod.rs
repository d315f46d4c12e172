//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives → routing engine takes a healthy-set snapshot
//!     → selector.rs (resolve active method, or the failover override)
//!     → Apply load balancing algorithm:
//!         - random.rs (uniform over the configured list)
//!         - round_robin.rs (rotate through the configured list)
//!         - weighted.rs (smooth weighted rotation)
//!         - ip_hash.rs (sticky pick among healthy upstreams)
//!     → Return candidate upstream or SelectionError
//! ```
//!
//! # Design Decisions
//! - Strategies see the full configured list; filtering to healthy
//!   upstreams happens one layer up, except for ip-hash which hashes over
//!   the healthy snapshot it is given
//! - Strategy state (cursors, current weights) lives inside each strategy
//! - The pool is immutable; only per-upstream atomics change at runtime

pub mod backend;
pub mod ip_hash;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod selector;
pub mod weighted;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::load_balancer::backend::{Upstream, UpstreamId};

pub use backend::{HealthState, InvalidUpstream};
pub use pool::UpstreamRegistry;
pub use selector::{SelectionMode, Selector};

/// Why a strategy could not produce a candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no servers configured")]
    NoServersConfigured,

    #[error("no servers available")]
    NoServersAvailable,

    #[error("client key required for ip-hash")]
    ClientKeyRequired,
}

/// A server selection algorithm.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick the next candidate.
    ///
    /// `servers` is the full configured list; `healthy` is the snapshot of
    /// the healthy set at the time of the call.
    fn next_server(
        &self,
        servers: &[Arc<Upstream>],
        healthy: &HashSet<UpstreamId>,
        client_key: Option<&str>,
    ) -> Result<Arc<Upstream>, SelectionError>;
}
