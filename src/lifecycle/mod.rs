//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build registry/selector/client → Initial screen
//!     → Spawn health loop → Bind listeners → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Switch flipped → Servers drain, health loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - One shutdown switch reaches every long-running task, even late subscribers

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{Balancer, StartupError};
