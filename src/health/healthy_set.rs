//! Shared set of upstreams currently eligible for traffic.
//!
//! Published copy-on-write through `ArcSwap`: writers (the health engine)
//! build a new set and swap it in atomically, readers take an immutable
//! snapshot and never observe a half-applied update.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::load_balancer::backend::UpstreamId;

/// Immutable view of the healthy set at one instant.
pub type HealthySnapshot = Arc<HashSet<UpstreamId>>;

#[derive(Debug, Clone)]
pub struct HealthySet {
    inner: Arc<ArcSwap<HashSet<UpstreamId>>>,
}

impl HealthySet {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(HashSet::new())),
        }
    }

    pub fn from_ids(ids: impl IntoIterator<Item = UpstreamId>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(ids.into_iter().collect())),
        }
    }

    pub fn snapshot(&self) -> HealthySnapshot {
        self.inner.load_full()
    }

    pub fn contains(&self, id: &UpstreamId) -> bool {
        self.inner.load().contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Add `id`; returns true if it was not already present.
    pub fn insert(&self, id: &UpstreamId) -> bool {
        let previous = self.inner.rcu(|current| {
            let mut next = HashSet::clone(current);
            next.insert(id.clone());
            next
        });
        !previous.contains(id)
    }

    /// Remove `id`; returns true if it was present.
    pub fn remove(&self, id: &UpstreamId) -> bool {
        let previous = self.inner.rcu(|current| {
            let mut next = HashSet::clone(current);
            next.remove(id);
            next
        });
        previous.contains(id)
    }
}

impl Default for HealthySet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let set = HealthySet::new();
        let a = UpstreamId::new("10.0.0.1", 80);

        assert!(set.insert(&a));
        assert!(!set.insert(&a));
        assert!(set.contains(&a));
        assert_eq!(set.len(), 1);

        assert!(set.remove(&a));
        assert!(!set.remove(&a));
        assert!(set.is_empty());
    }

    #[test]
    fn test_snapshot_is_stable() {
        let a = UpstreamId::new("10.0.0.1", 80);
        let b = UpstreamId::new("10.0.0.2", 80);
        let set = HealthySet::from_ids([a.clone()]);

        let snapshot = set.snapshot();
        set.insert(&b);
        set.remove(&a);

        assert!(snapshot.contains(&a));
        assert!(!snapshot.contains(&b));
        assert!(set.contains(&b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers() {
        let set = HealthySet::new();
        let mut handles = Vec::new();
        for i in 0..32u16 {
            let set = set.clone();
            handles.push(tokio::spawn(async move {
                set.insert(&UpstreamId::new("10.0.0.1", 9000 + i));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(set.len(), 32);
    }
}
