//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: upstream, attempt, status)
//!     → logging.rs subscriber (EnvFilter + fmt)
//!
//! Inbound requests:
//!     → tower-http TraceLayer span carrying x-request-id
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Counters live on the upstreams and engine as atomics, read by the admin API

pub mod logging;
