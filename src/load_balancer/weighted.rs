//! Smooth weighted round-robin (nginx style).
//!
//! Every pick adds each upstream's weight to its running weight, takes the
//! largest running weight (first on ties) and subtracts the total from the
//! winner. Over one cycle of `sum(weights)` picks each upstream is chosen
//! exactly `weight` times, spread out rather than in bursts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::backend::{Upstream, UpstreamId};
use crate::load_balancer::{LoadBalancer, SelectionError};

#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    current: Mutex<Vec<i64>>,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server(
        &self,
        servers: &[Arc<Upstream>],
        _healthy: &HashSet<UpstreamId>,
        _client_key: Option<&str>,
    ) -> Result<Arc<Upstream>, SelectionError> {
        if servers.is_empty() {
            return Err(SelectionError::NoServersConfigured);
        }

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.len() != servers.len() {
            *current = vec![0; servers.len()];
        }

        let mut total: i64 = 0;
        let mut best = 0;
        for (i, server) in servers.iter().enumerate() {
            let weight = i64::from(server.weight.max(1));
            current[i] += weight;
            total += weight;
            if current[i] > current[best] {
                best = i;
            }
        }
        current[best] -= total;

        Ok(servers[best].clone())
    }
}
