//! Replica router service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   REPLICA ROUTER                      │
//!                 │                                                       │
//!   Query         │  ┌─────────┐   ┌────────────┐   ┌───────────────┐    │
//!   ──────────────┼─▶│ gateway │──▶│ before-hook│──▶│ load_balancer │    │
//!                 │  └─────────┘   └────────────┘   └───────┬───────┘    │
//!                 │                                         ▼            │
//!                 │                                  writer / reader ────┼──▶ DB
//!                 │                ┌────────────┐           │            │
//!   Result        │                │ after-hook │◀──────────┘            │
//!   ◀─────────────┼────────────────┤  (errors)  │                        │
//!                 │                └─────┬──────┘                        │
//!                 │                      ▼                               │
//!                 │              ┌──────────────┐                        │
//!                 │              │health monitor│ reconnection loop      │
//!                 │              └──────────────┘                        │
//!                 │   config · observability · admin API · lifecycle     │
//!                 └──────────────────────────────────────────────────────┘
//! ```
//!
//! The binary watches the configured nodes with TCP probes and serves their
//! state over the admin API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use replica_router::admin::{setup_admin_router, AdminState};
use replica_router::config::loader::load_config;
use replica_router::net::tcp::TcpConnector;
use replica_router::observability::{logging, metrics, spawn_status_logger};
use replica_router::DatabaseRegistry;

#[derive(Parser)]
#[command(name = "replica-router")]
#[command(about = "Replica-aware query router", long_about = None)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, default_value = "replica-router.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability);
    tracing::info!("replica-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        databases = config.databases.len(),
        reconnect_interval_ms = config.health_check.reconnect_interval_ms,
        probe_timeout_ms = config.health_check.probe_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let connector = Arc::new(TcpConnector::new(config.health_check.probe_timeout()));
    let registry = Arc::new(DatabaseRegistry::connect(&config, connector).await?);

    if config.observability.status_log_interval_secs > 0 {
        spawn_status_logger(
            &registry,
            Duration::from_secs(config.observability.status_log_interval_secs),
        );
    }

    if config.admin.enabled {
        let app = setup_admin_router(AdminState {
            registry: registry.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        });
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let mut shutdown = registry.shutdown().subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    registry.close();

    tracing::info!("Shutdown complete");
    Ok(())
}
