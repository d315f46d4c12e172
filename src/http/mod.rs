//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request ID, tracing)
//!     → request.rs (buffer body, filter headers)
//!     → routing engine picks an upstream and forwards via client.rs
//!     → response.rs (filter headers)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{HyperUpstreamClient, UpstreamClient, UpstreamRequest, UpstreamResponse};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
