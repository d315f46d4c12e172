//! Timeout enforcement.
//!
//! # Responsibilities
//! - Convert configured timeout budgets into durations
//! - Wrap outbound phases with a deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A zero budget disables that deadline
//! - Timeout errors are distinct from other transport errors

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::config::TimeoutConfig;
use crate::http::client::TransportError;

/// The four outbound budgets applied to every proxied attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpstreamTimeouts {
    /// Connection establishment.
    pub connect: Option<Duration>,
    /// Response production (head and body).
    pub read: Option<Duration>,
    /// Request transmission.
    pub send: Option<Duration>,
    /// Ceiling on one whole attempt.
    pub next: Option<Duration>,
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl From<&TimeoutConfig> for UpstreamTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: secs(config.connect_secs),
            read: secs(config.read_secs),
            send: secs(config.send_secs),
            next: secs(config.next_secs),
        }
    }
}

impl UpstreamTimeouts {
    /// Budget for sending the request and receiving the response head.
    pub fn response_head(&self) -> Option<Duration> {
        match (self.send, self.read) {
            (Some(send), Some(read)) => Some(send + read),
            (send, read) => send.or(read),
        }
    }
}

/// Run `fut` under `limit`, mapping expiry to [`TransportError::Timeout`].
pub async fn within<F, T>(limit: Option<Duration>, phase: &'static str, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match limit {
        Some(after) => time::timeout(after, fut)
            .await
            .map_err(|_| TransportError::Timeout { after, phase })?,
        None => fut.await,
    }
}
