//! Active health checking.
//!
//! # Responsibilities
//! - Screen every upstream once before traffic is accepted
//! - Periodically probe all upstreams concurrently
//! - Fold probe results into hysteresis records and maintain the healthy set

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::http::StatusCode;
use futures_util::future::join_all;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::alert::Alerter;
use crate::health::healthy_set::HealthySet;
use crate::health::state::{HealthRecord, Thresholds, Transition};
use crate::http::client::UpstreamClient;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::load_balancer::backend::{HealthState, Upstream, UpstreamId};
use crate::load_balancer::pool::UpstreamRegistry;

pub struct HealthMonitor {
    registry: Arc<UpstreamRegistry>,
    healthy: HealthySet,
    client: Arc<dyn UpstreamClient>,
    config: HealthCheckConfig,
    thresholds: Thresholds,
    records: HashMap<UpstreamId, Mutex<HealthRecord>>,
    alerter: Option<Alerter>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<UpstreamRegistry>,
        healthy: HealthySet,
        client: Arc<dyn UpstreamClient>,
        config: HealthCheckConfig,
    ) -> Self {
        let records = registry
            .servers()
            .iter()
            .map(|s| (s.id.clone(), Mutex::new(HealthRecord::default())))
            .collect();

        Self {
            thresholds: Thresholds::from(&config),
            registry,
            healthy,
            client,
            config,
            records,
            alerter: None,
        }
    }

    pub fn with_alerter(mut self, alerter: Option<Alerter>) -> Self {
        self.alerter = alerter;
        self
    }

    /// Copy of the probe history for `id`.
    pub fn record(&self, id: &UpstreamId) -> Option<HealthRecord> {
        self.records
            .get(id)
            .map(|r| r.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn probe_url(&self, server: &Upstream) -> String {
        format!("{}{}", server.url(), self.config.path)
    }

    /// Probe every upstream once, in order, before the listener opens.
    ///
    /// A single 200 is enough to enter the healthy set here; no hysteresis.
    pub async fn initial_health_screen(&self) {
        let timeout = Duration::from_millis(self.config.initial_timeout_ms);

        for server in self.registry.servers() {
            match self.client.probe(&self.probe_url(server), timeout).await {
                Ok(status) if status == StatusCode::OK => {
                    self.healthy.insert(&server.id);
                    server.set_health(HealthState::Healthy);
                    if let Some(record) = self.records.get(&server.id) {
                        record.lock().unwrap_or_else(PoisonError::into_inner).healthy = true;
                    }
                    tracing::info!(upstream = %server.id, "Initial screen: healthy");
                }
                Ok(status) => {
                    tracing::warn!(upstream = %server.id, status = %status, "Initial screen: unhealthy status");
                }
                Err(e) => {
                    tracing::warn!(upstream = %server.id, error = %e, "Initial screen: unreachable");
                }
            }
        }

        tracing::info!(
            healthy = self.healthy.len(),
            total = self.registry.len(),
            "Initial health screen complete"
        );
    }

    /// Probe rounds until shutdown. A round finishes completely before the
    /// interval sleep starts.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);

        loop {
            tokio::select! {
                _ = self.run_checks() => {}
                _ = shutdown.recv() => break,
            }
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// One round: probe all upstreams concurrently and apply every result.
    pub async fn run_checks(&self) {
        let servers = self.registry.servers();
        join_all(servers.iter().map(|s| self.perform_health_check(s))).await;
        tracing::debug!(healthy = self.healthy.len(), total = servers.len(), "Health round complete");
    }

    /// GET the probe path; true only for a 200. Never errors.
    pub async fn check_server(&self, server: &Upstream) -> bool {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        match self.client.probe(&self.probe_url(server), timeout).await {
            Ok(status) if status == StatusCode::OK => true,
            Ok(status) => {
                tracing::debug!(upstream = %server.id, status = %status, "Health check failed: non-200 status");
                false
            }
            Err(e) => {
                tracing::debug!(upstream = %server.id, error = %e, "Health check failed");
                false
            }
        }
    }

    /// Probe one upstream and apply the hysteresis transition.
    pub async fn perform_health_check(&self, server: &Arc<Upstream>) -> Transition {
        let success = self.check_server(server).await;
        self.apply(server, success)
    }

    fn apply(&self, server: &Upstream, success: bool) -> Transition {
        let Some(cell) = self.records.get(&server.id) else {
            return Transition::Unchanged;
        };
        let mut record = cell.lock().unwrap_or_else(PoisonError::into_inner);
        let transition = record.observe(success, self.healthy.contains(&server.id), self.thresholds);

        match transition {
            Transition::Promote => {
                self.healthy.insert(&server.id);
                server.set_health(HealthState::Healthy);
                tracing::info!(
                    upstream = %server.id,
                    consecutive_successes = record.consecutive_successes,
                    "Upstream marked healthy"
                );
            }
            Transition::Demote => {
                self.healthy.remove(&server.id);
                server.set_health(HealthState::Unhealthy);
                server.record_failure();
                tracing::warn!(
                    upstream = %server.id,
                    consecutive_failures = record.consecutive_failures,
                    "Upstream marked unhealthy"
                );
            }
            Transition::Unchanged => {}
        }

        if !success {
            if let Some(alerter) = &self.alerter {
                alerter.notify(server, record.consecutive_failures);
            }
        }

        transition
    }
}
