//! Proxy/routing engine.
//!
//! # Responsibilities
//! - Select a candidate upstream that is in the current healthy snapshot
//! - Forward the buffered request through the outbound client
//! - Fail over to another upstream on 5xx or transport errors, up to the
//!   retry budget
//! - Count successful deliveries per upstream and process-wide
//!
//! The engine reads the healthy set but never writes it.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use rand::seq::SliceRandom;

use crate::health::HealthySet;
use crate::http::client::{UpstreamClient, UpstreamRequest, UpstreamResponse};
use crate::load_balancer::backend::{Upstream, UpstreamId};
use crate::load_balancer::{SelectionMode, Selector, UpstreamRegistry};
use crate::resilience::{classify_status, AttemptOutcome, RetryPolicy, UpstreamTimeouts};
use crate::routing::error::ProxyError;

/// An inbound request, buffered and stripped of hop-by-hop headers.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub method: Method,
    /// Original path plus query string, e.g. `/api/items?page=2`.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_ip: IpAddr,
}

impl ProxiedRequest {
    fn for_upstream(&self, upstream: &Upstream) -> UpstreamRequest {
        UpstreamRequest {
            method: self.method.clone(),
            url: format!("{}{}", upstream.url(), self.path_and_query),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Per-request retry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext {
    /// Attempts made so far.
    pub attempt: u32,
    /// Sticky routing key (client IP).
    pub client_key: String,
}

impl RetryContext {
    pub fn new(client_key: impl Into<String>) -> Self {
        Self {
            attempt: 0,
            client_key: client_key.into(),
        }
    }

    /// The first selection uses the active method; every reselection after
    /// a failed attempt is a failover selection.
    pub fn selection_mode(&self) -> SelectionMode {
        if self.attempt == 0 {
            SelectionMode::Configured
        } else {
            SelectionMode::Failover
        }
    }
}

pub struct ProxyEngine {
    registry: Arc<UpstreamRegistry>,
    healthy: HealthySet,
    selector: Arc<Selector>,
    client: Arc<dyn UpstreamClient>,
    retry: RetryPolicy,
    timeouts: UpstreamTimeouts,
    total_served: AtomicU64,
}

impl ProxyEngine {
    pub fn new(
        registry: Arc<UpstreamRegistry>,
        healthy: HealthySet,
        selector: Arc<Selector>,
        client: Arc<dyn UpstreamClient>,
        retry: RetryPolicy,
        timeouts: UpstreamTimeouts,
    ) -> Self {
        Self {
            registry,
            healthy,
            selector,
            client,
            retry,
            timeouts,
            total_served: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<UpstreamRegistry> {
        &self.registry
    }

    pub fn healthy(&self) -> &HealthySet {
        &self.healthy
    }

    pub fn selector(&self) -> &Arc<Selector> {
        &self.selector
    }

    /// Requests answered with 200 since startup.
    pub fn total_served(&self) -> u64 {
        self.total_served.load(Ordering::Relaxed)
    }

    /// Draw candidates until one is in the healthy snapshot.
    ///
    /// `failed` is the upstream whose attempt just failed; it is skipped
    /// whenever another healthy upstream exists. Draws are bounded by the
    /// total configured weight, which is enough for the cyclic strategies
    /// to visit every upstream. If the budget runs out (random can keep
    /// missing), a random eligible upstream is used instead.
    pub fn select(
        &self,
        client_key: &str,
        mode: SelectionMode,
        failed: Option<&UpstreamId>,
    ) -> Result<Arc<Upstream>, ProxyError> {
        let snapshot = self.healthy.snapshot();
        if snapshot.is_empty() {
            return Err(ProxyError::NoHealthyUpstream);
        }

        let avoid = failed.filter(|_| snapshot.len() > 1);
        let eligible = |id: &UpstreamId| snapshot.contains(id) && avoid != Some(id);

        let servers = self.registry.servers();
        for _ in 0..self.registry.total_weight().max(1) {
            let candidate = self.selector.next_server(servers, &snapshot, Some(client_key), mode)?;
            if eligible(&candidate.id) {
                return Ok(candidate);
            }
        }

        let candidates: Vec<&Arc<Upstream>> = servers.iter().filter(|s| eligible(&s.id)).collect();
        candidates
            .choose(&mut rand::thread_rng())
            .map(|s| Arc::clone(*s))
            .ok_or(ProxyError::NoHealthyUpstream)
    }

    /// Forward `request`, failing over between upstreams as needed.
    pub async fn forward(&self, request: ProxiedRequest) -> Result<UpstreamResponse, ProxyError> {
        let mut ctx = RetryContext::new(request.client_ip.to_string());
        let mut upstream = self.select(&ctx.client_key, ctx.selection_mode(), None)?;

        loop {
            ctx.attempt += 1;
            tracing::debug!(
                upstream = %upstream.id,
                attempt = ctx.attempt,
                method = %request.method,
                path = %request.path_and_query,
                "Proxying request"
            );

            match self.client.send(request.for_upstream(&upstream), &self.timeouts).await {
                Ok(response) => match classify_status(response.status) {
                    AttemptOutcome::Success => {
                        upstream.record_served();
                        self.total_served.fetch_add(1, Ordering::Relaxed);
                        return Ok(response);
                    }
                    AttemptOutcome::PassThrough => return Ok(response),
                    AttemptOutcome::Retry => {
                        tracing::warn!(
                            upstream = %upstream.id,
                            attempt = ctx.attempt,
                            status = %response.status,
                            "Upstream returned server error, switching upstream"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        upstream = %upstream.id,
                        attempt = ctx.attempt,
                        error = %e,
                        "Upstream transport error, switching upstream"
                    );
                }
            }

            if !self.retry.allows_another(ctx.attempt) {
                tracing::error!(
                    attempts = ctx.attempt,
                    path = %request.path_and_query,
                    "All retries failed"
                );
                return Err(ProxyError::RetriesExhausted { attempts: ctx.attempt });
            }

            upstream = self.select(&ctx.client_key, ctx.selection_mode(), Some(&upstream.id))?;
        }
    }
}
