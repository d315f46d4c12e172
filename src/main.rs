//! HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ routing engine ──▶ load_balancer
//!                                           │               (selector)
//!                                           ▼
//!     Client Response                  http client ──────────────────▶ Upstream
//!     ◀─────────────── response ◀───── (timeouts, failover)
//!
//!     Background: health monitor → healthy set ← read by routing engine
//!     Optional:   admin API (status, backends, strategy)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use upstream_lb::config::load_config;
use upstream_lb::lifecycle::{signals, startup, Shutdown};
use upstream_lb::observability::logging;

#[derive(Parser)]
#[command(name = "upstream-lb")]
#[command(about = "HTTP load balancer with active health checks", long_about = None)]
struct Args {
    /// Configuration file (TOML, or JSON with a .json extension).
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("upstream-lb: {}: {e}", args.config.display());
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        bind_address = %config.listener.bind_address(),
        upstreams = config.upstreams.len(),
        method = %config.lb_method,
        "upstream-lb starting"
    );

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&signal).await;
    });

    match startup::run(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "upstream-lb failed");
            ExitCode::FAILURE
        }
    }
}
