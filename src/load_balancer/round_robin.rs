//! Round-robin load balancing strategy.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::{Upstream, UpstreamId};
use crate::load_balancer::{LoadBalancer, SelectionError};

/// Round-robin selector.
/// Stores an internal cursor to rotate through the configured list.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(
        &self,
        servers: &[Arc<Upstream>],
        _healthy: &HashSet<UpstreamId>,
        _client_key: Option<&str>,
    ) -> Result<Arc<Upstream>, SelectionError> {
        if servers.is_empty() {
            return Err(SelectionError::NoServersConfigured);
        }

        let len = servers.len();
        // Keep the stored cursor in [0, len).
        let index = match self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| Some((c % len + 1) % len))
        {
            Ok(prev) | Err(prev) => prev % len,
        };
        Ok(servers[index].clone())
    }
}
