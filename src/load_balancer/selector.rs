//! Runtime-switchable strategy dispatch.
//!
//! The selector owns one instance of every strategy so that their state
//! (round-robin cursor, weighted running totals) survives a method swap.
//! Swapping only changes the active tag.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::LbMethod;
use crate::load_balancer::backend::{Upstream, UpstreamId};
use crate::load_balancer::ip_hash::IpHash;
use crate::load_balancer::random::Random;
use crate::load_balancer::round_robin::RoundRobin;
use crate::load_balancer::weighted::WeightedRoundRobin;
use crate::load_balancer::{LoadBalancer, SelectionError};

/// How a single selection picks its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Use the active method.
    Configured,
    /// Reselection after a failed attempt: ip-hash is downgraded to
    /// round-robin for this one call so the same sticky target is not
    /// recomputed. Other methods are used as-is.
    Failover,
}

fn method_to_tag(method: LbMethod) -> u8 {
    match method {
        LbMethod::Random => 0,
        LbMethod::RoundRobin => 1,
        LbMethod::IpHash => 2,
        LbMethod::WeightedRoundRobin => 3,
    }
}

fn tag_to_method(tag: u8) -> LbMethod {
    match tag {
        0 => LbMethod::Random,
        2 => LbMethod::IpHash,
        3 => LbMethod::WeightedRoundRobin,
        _ => LbMethod::RoundRobin,
    }
}

#[derive(Debug)]
pub struct Selector {
    active: AtomicU8,
    random: Random,
    round_robin: RoundRobin,
    ip_hash: IpHash,
    weighted: WeightedRoundRobin,
}

impl Selector {
    pub fn new(method: LbMethod) -> Self {
        Self {
            active: AtomicU8::new(method_to_tag(method)),
            random: Random::new(),
            round_robin: RoundRobin::new(),
            ip_hash: IpHash::new(),
            weighted: WeightedRoundRobin::new(),
        }
    }

    /// Currently active method.
    pub fn method(&self) -> LbMethod {
        tag_to_method(self.active.load(Ordering::Acquire))
    }

    /// Swap the active method. Strategy state is left untouched.
    pub fn set_method(&self, method: LbMethod) {
        let previous = tag_to_method(self.active.swap(method_to_tag(method), Ordering::AcqRel));
        if previous != method {
            tracing::info!(from = %previous, to = %method, "Load balancing method changed");
        }
    }

    /// Method a selection in `mode` would use right now.
    pub fn effective_method(&self, mode: SelectionMode) -> LbMethod {
        match (mode, self.method()) {
            (SelectionMode::Failover, LbMethod::IpHash) => LbMethod::RoundRobin,
            (_, method) => method,
        }
    }

    fn strategy(&self, method: LbMethod) -> &dyn LoadBalancer {
        match method {
            LbMethod::Random => &self.random,
            LbMethod::RoundRobin => &self.round_robin,
            LbMethod::IpHash => &self.ip_hash,
            LbMethod::WeightedRoundRobin => &self.weighted,
        }
    }

    pub fn next_server(
        &self,
        servers: &[Arc<Upstream>],
        healthy: &HashSet<UpstreamId>,
        client_key: Option<&str>,
        mode: SelectionMode,
    ) -> Result<Arc<Upstream>, SelectionError> {
        self.strategy(self.effective_method(mode))
            .next_server(servers, healthy, client_key)
    }
}
