//! Random load balancing strategy.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::load_balancer::backend::{Upstream, UpstreamId};
use crate::load_balancer::{LoadBalancer, SelectionError};

/// Uniform choice over the configured list. Stateless.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_server(
        &self,
        servers: &[Arc<Upstream>],
        _healthy: &HashSet<UpstreamId>,
        _client_key: Option<&str>,
    ) -> Result<Arc<Upstream>, SelectionError> {
        servers
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(SelectionError::NoServersConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::{all_healthy, upstreams};

    #[test]
    fn test_random_covers_list() {
        let lb = Random::new();
        let servers = upstreams(3);
        let healthy = all_healthy(&servers);

        let mut seen = HashSet::new();
        for _ in 0..300 {
            seen.insert(lb.next_server(&servers, &healthy, None).unwrap().id.port);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(
            Random::new().next_server(&[], &HashSet::new(), None).unwrap_err(),
            SelectionError::NoServersConfigured
        );
    }
}
