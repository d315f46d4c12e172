//! Upstream registry.
//!
//! # Responsibilities
//! - Own the fixed, ordered list of configured upstreams
//! - Report the total weight that bounds selection redraws
//!
//! The list never changes after construction; per-upstream state is mutated
//! through the upstream's own atomics.

use std::sync::Arc;

use crate::config::UpstreamConfig;
use crate::load_balancer::backend::{InvalidUpstream, Upstream};

/// Fixed set of configured upstreams.
#[derive(Debug)]
pub struct UpstreamRegistry {
    servers: Vec<Arc<Upstream>>,
}

impl UpstreamRegistry {
    /// Build the registry from configuration, preserving declaration order.
    pub fn new(configs: &[UpstreamConfig]) -> Result<Self, InvalidUpstream> {
        let servers = configs
            .iter()
            .map(|c| Upstream::from_config(c).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { servers })
    }

    /// All configured upstreams, in configuration order.
    pub fn servers(&self) -> &[Arc<Upstream>] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Sum of all weights; at least `len()` since every weight is >= 1.
    pub fn total_weight(&self) -> usize {
        self.servers.iter().map(|s| s.weight as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::UpstreamId;

    #[test]
    fn test_registry_from_config() {
        let registry = UpstreamRegistry::new(&[
            UpstreamConfig::new("http://127.0.0.1:9001"),
            UpstreamConfig::new("http://127.0.0.1:9002").with_weight(4),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.total_weight(), 5);
        assert_eq!(registry.servers()[1].url(), "http://127.0.0.1:9002");
        assert_eq!(registry.servers()[0].id, UpstreamId::new("127.0.0.1", 9001));
    }

    #[test]
    fn test_registry_rejects_bad_domain() {
        assert!(UpstreamRegistry::new(&[UpstreamConfig::new("::nope")]).is_err());
    }
}
