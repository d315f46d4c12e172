//! Failure-streak alerts.
//!
//! One JSON POST per streak, sent when an upstream's consecutive probe
//! failures reach the configured threshold. Delivery runs on its own task;
//! a slow or failing webhook never holds up a health round.

use std::time::Duration;

use serde::Serialize;

use crate::config::AlertConfig;
use crate::load_balancer::backend::Upstream;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AlertPayload {
    pub upstream: String,
    pub consecutive_failures: u32,
    pub status: &'static str,
}

#[derive(Debug, Clone)]
pub struct Alerter {
    webhook: String,
    failure_streak: u32,
    client: reqwest::Client,
}

impl Alerter {
    /// Build an alerter if a webhook is configured.
    pub fn from_config(config: &AlertConfig) -> Option<Self> {
        let webhook = config.webhook.clone()?;
        let client = match reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Alert client unavailable, alerting disabled");
                return None;
            }
        };
        Some(Self {
            webhook,
            failure_streak: config.failure_streak.max(1),
            client,
        })
    }

    /// Payload to send for this streak length, if any.
    pub fn alert_for(&self, upstream: &Upstream, consecutive_failures: u32) -> Option<AlertPayload> {
        (consecutive_failures == self.failure_streak).then(|| AlertPayload {
            upstream: upstream.url().to_string(),
            consecutive_failures,
            status: upstream.health().as_str(),
        })
    }

    /// Fire-and-forget delivery.
    pub fn notify(&self, upstream: &Upstream, consecutive_failures: u32) {
        let Some(payload) = self.alert_for(upstream, consecutive_failures) else {
            return;
        };

        let client = self.client.clone();
        let webhook = self.webhook.clone();
        tokio::spawn(async move {
            match client.post(&webhook).json(&payload).send().await {
                Ok(res) if res.status().is_success() => {
                    tracing::info!(upstream = %payload.upstream, "Failure alert delivered");
                }
                Ok(res) => {
                    tracing::warn!(upstream = %payload.upstream, status = %res.status(), "Alert webhook rejected alert");
                }
                Err(e) => {
                    tracing::warn!(upstream = %payload.upstream, error = %e, "Alert delivery failed");
                }
            }
        });
    }
}
