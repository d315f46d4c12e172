//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (active.rs):
//!     initial_health_screen → one probe per upstream, single success admits
//!
//! Active health checks (active.rs):
//!     Round: probe all upstreams concurrently
//!     → state.rs folds each result into the upstream's record
//!     → healthy_set.rs updated on promote/demote
//!     → sleep interval, repeat
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - The health engine is the only writer of the healthy set
//! - Probe failures never propagate; they only feed streak counters
//! - Health state is per-upstream

pub mod active;
pub mod alert;
pub mod healthy_set;
pub mod state;

pub use active::HealthMonitor;
pub use healthy_set::HealthySet;
pub use state::{HealthRecord, Thresholds, Transition};
