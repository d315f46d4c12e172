//! IP-hash (sticky) load balancing strategy.
//!
//! Healthy upstreams are ordered by the hash of their URL. The client key is
//! hashed and located in that sorted sequence with right-biased bisection
//! (a tie with an existing entry lands after it); the insertion point modulo
//! the healthy count is the chosen index.
//!
//! This is not a consistent-hash ring: there are no virtual nodes, and a
//! change in healthy membership can move keys that were mapped to upstreams
//! still present.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::load_balancer::backend::{Upstream, UpstreamId};
use crate::load_balancer::{LoadBalancer, SelectionError};

#[derive(Debug, Default)]
pub struct IpHash;

impl IpHash {
    pub fn new() -> Self {
        Self
    }
}

fn hash_str(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl LoadBalancer for IpHash {
    fn next_server(
        &self,
        servers: &[Arc<Upstream>],
        healthy: &HashSet<UpstreamId>,
        client_key: Option<&str>,
    ) -> Result<Arc<Upstream>, SelectionError> {
        if servers.is_empty() {
            return Err(SelectionError::NoServersConfigured);
        }
        let key = client_key.ok_or(SelectionError::ClientKeyRequired)?;

        let mut ring: Vec<(u64, &Arc<Upstream>)> = servers
            .iter()
            .filter(|s| healthy.contains(&s.id))
            .map(|s| (hash_str(s.url()), s))
            .collect();
        if ring.is_empty() {
            return Err(SelectionError::NoServersAvailable);
        }
        ring.sort_by_key(|(h, _)| *h);

        let key_hash = hash_str(key);
        let position = ring.partition_point(|(h, _)| *h <= key_hash);
        let index = position % ring.len();

        tracing::trace!(key = %key, key_hash, index, upstream = %ring[index].1.id, "ip-hash selection");
        Ok(ring[index].1.clone())
    }
}
