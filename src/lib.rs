//! HTTP load balancer library.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::{Balancer, Shutdown};
pub use routing::ProxyEngine;
