//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and build every subsystem in dependency order
//! - Screen upstreams once before traffic is accepted
//! - Start the health loop, then bind and serve the listeners
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::validation::validate_config;
use crate::config::{BalancerConfig, ConfigError};
use crate::health::alert::Alerter;
use crate::health::{HealthMonitor, HealthySet};
use crate::http::{HttpServer, HyperUpstreamClient, UpstreamClient};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{InvalidUpstream, Selector, UpstreamRegistry};
use crate::resilience::{RetryPolicy, UpstreamTimeouts};
use crate::routing::ProxyEngine;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid upstream: {0}")]
    Upstream(#[from] InvalidUpstream),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A fully wired load balancer that has not started serving yet.
pub struct Balancer {
    config: BalancerConfig,
    engine: Arc<ProxyEngine>,
    monitor: HealthMonitor,
}

impl Balancer {
    /// Build all subsystems with the production hyper client.
    pub fn build(config: BalancerConfig) -> Result<Self, StartupError> {
        let timeouts = UpstreamTimeouts::from(&config.timeouts);
        let client: Arc<dyn UpstreamClient> = Arc::new(
            HyperUpstreamClient::new(&timeouts).with_response_limit(config.listener.max_response_bytes),
        );
        Self::with_client(config, client)
    }

    /// Build all subsystems over a caller-provided outbound client.
    pub fn with_client(config: BalancerConfig, client: Arc<dyn UpstreamClient>) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let registry = Arc::new(UpstreamRegistry::new(&config.upstreams)?);
        let healthy = HealthySet::new();
        let selector = Arc::new(Selector::new(config.lb_method));

        let engine = Arc::new(ProxyEngine::new(
            registry.clone(),
            healthy.clone(),
            selector,
            client.clone(),
            RetryPolicy::from(&config.retries),
            UpstreamTimeouts::from(&config.timeouts),
        ));

        let monitor = HealthMonitor::new(registry, healthy, client, config.health_check.clone())
            .with_alerter(Alerter::from_config(&config.alerting));

        if config.self_healing {
            tracing::warn!("self_healing is set but has no effect");
        }

        tracing::info!(
            upstreams = config.upstreams.len(),
            method = %config.lb_method,
            max_retries = config.retries.max_retries,
            "Load balancer initialized"
        );

        Ok(Self { config, engine, monitor })
    }

    pub fn engine(&self) -> &Arc<ProxyEngine> {
        &self.engine
    }

    /// Probe every upstream once to seed the healthy set.
    pub async fn screen(&self) {
        self.monitor.initial_health_screen().await;
    }

    /// Spawn the health loop and serve on `listener` until shutdown.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        let Balancer { config, engine, monitor } = self;

        let health_task = tokio::spawn(monitor.run(shutdown.subscribe()));

        let admin_task = if config.admin.enabled {
            let address = config.admin.bind_address.clone();
            let admin_listener = TcpListener::bind(&address)
                .await
                .map_err(|source| StartupError::Bind { address, source })?;
            let router = setup_admin_router(AdminState {
                engine: engine.clone(),
                api_key: Arc::from(config.admin.api_key.as_str()),
            });
            let mut admin_shutdown = shutdown.subscribe();
            tracing::info!(address = %config.admin.bind_address, "Admin API listening");
            Some(tokio::spawn(async move {
                axum::serve(admin_listener, router)
                    .with_graceful_shutdown(async move { admin_shutdown.recv().await })
                    .await
            }))
        } else {
            None
        };

        let served = HttpServer::new(engine, &config.listener)
            .run(listener, shutdown.subscribe())
            .await;

        // The proxy listener can also stop on its own error.
        shutdown.trigger();
        if let Some(task) = admin_task {
            match task.await {
                Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
                Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
                Ok(Ok(())) => {}
            }
        }
        if let Err(e) = health_task.await {
            tracing::error!(error = %e, "Health monitor task panicked");
        }

        served.map_err(StartupError::Serve)
    }
}

/// Full boot sequence: build, screen, bind, serve.
pub async fn run(config: BalancerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let address = config.listener.bind_address();
    let balancer = Balancer::build(config)?;
    balancer.screen().await;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    balancer.serve(listener, &shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    use crate::config::UpstreamConfig;
    use crate::http::client::fake::FakeClient;

    fn config(upstreams: &[&str]) -> BalancerConfig {
        BalancerConfig {
            upstreams: upstreams.iter().map(|u| UpstreamConfig::new(*u)).collect(),
            ..BalancerConfig::default()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let client = Arc::new(FakeClient::new(|_| Some(StatusCode::OK)));
        let err = Balancer::with_client(config(&[]), client).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn test_screen_seeds_healthy_set() {
        let client = Arc::new(FakeClient::new(|url| {
            url.starts_with("http://127.0.0.1:9000").then_some(StatusCode::OK)
        }));
        let balancer =
            Balancer::with_client(config(&["http://127.0.0.1:9000", "http://127.0.0.1:9001"]), client).unwrap();

        assert!(balancer.engine().healthy().is_empty());
        balancer.screen().await;
        assert_eq!(balancer.engine().healthy().len(), 1);
    }
}
