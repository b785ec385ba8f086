//! Active health checking: the reconnection loop.
//!
//! # Responsibilities
//! - Start at most one loop per node set once one of its nodes goes offline
//! - Periodically probe offline nodes and bring them back online
//! - Retry opening readers whose handle could not be created at startup
//! - Stop once every node in the set is online, or on shutdown

use std::sync::Arc;
use std::time::Duration;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::{HealthCheckConfig, NodeConfig};
use crate::health::probe::probe;
use crate::lifecycle::Shutdown;
use crate::net::Connection;
use crate::observability::metrics;
use crate::observability::QueryLog;
use crate::replication::{Node, NodeRole, NodeSet};

pub struct HealthMonitor {
    config: HealthCheckConfig,
    shutdown: Shutdown,
}

impl HealthMonitor {
    /// Zero timings fall back to the defaults: a zero period cannot drive the loop.
    pub fn new(mut config: HealthCheckConfig, shutdown: Shutdown) -> Self {
        let defaults = HealthCheckConfig::default();
        if config.reconnect_interval_ms == 0 {
            tracing::warn!(
                default_ms = defaults.reconnect_interval_ms,
                "reconnect_interval_ms is 0, using the default"
            );
            config.reconnect_interval_ms = defaults.reconnect_interval_ms;
        }
        if config.probe_timeout_ms == 0 {
            tracing::warn!(
                default_ms = defaults.probe_timeout_ms,
                "probe_timeout_ms is 0, using the default"
            );
            config.probe_timeout_ms = defaults.probe_timeout_ms;
        }
        Self { config, shutdown }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Start the reconnection loop for `set` unless one is already running.
    ///
    /// Returns true if this call started the loop. Must be called from within
    /// a tokio runtime.
    pub fn arm<C: Connection>(&self, set: &Arc<NodeSet<C>>) -> bool {
        if !set.try_claim_reconnector() {
            return false;
        }

        // Subscribe before checking the latch so a concurrent trigger is not missed.
        let shutdown = self.shutdown.subscribe();
        if self.shutdown.is_triggered() {
            set.release_reconnector();
            return false;
        }

        tracing::info!(
            database = %set.database(),
            interval_ms = self.config.reconnect_interval_ms,
            "Reconnector starting"
        );

        tokio::spawn(reconnect_loop(
            set.clone(),
            self.config.reconnect_interval(),
            self.config.probe_timeout(),
            shutdown,
        ));
        true
    }
}

async fn reconnect_loop<C: Connection>(
    set: Arc<NodeSet<C>>,
    interval: Duration,
    timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.recv() => {
                tracing::info!(database = %set.database(), "Reconnector received shutdown signal, exiting loop");
                set.release_reconnector();
                return;
            }
        }

        reconnect_pass(&set, timeout).await;

        if set.all_online() {
            set.release_reconnector();
            // A node may have failed between the pass and the release while the
            // flag still blocked a new loop; keep going if so.
            if set.all_online() || !set.try_claim_reconnector() {
                tracing::info!(database = %set.database(), "All nodes online, reconnector stopped");
                return;
            }
        }
    }
}

/// Open deferred readers, then probe every offline node of `set` once, concurrently.
pub(crate) async fn reconnect_pass<C: Connection>(set: &NodeSet<C>, timeout: Duration) {
    let database = set.database();
    open_deferred(set).await;
    let offline: Vec<_> = set.nodes().into_iter().filter(|n| !n.is_online()).collect();

    let results = join_all(offline.iter().map(|node| probe(database, node, timeout))).await;

    for (node, result) in offline.into_iter().zip(results) {
        match result {
            Ok(()) => {
                if node.mark_online() {
                    metrics::record_node_online(database, node.name(), true);
                    tracing::warn!(
                        database = %database,
                        node = %node.name(),
                        role = %node.role(),
                        "Node is reconnected and online now"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    database = %database,
                    node = %node.name(),
                    ping_tries = node.ping_tries(),
                    error = %e,
                    "Node is still offline"
                );
            }
        }
    }
}

/// Try to open every deferred reader of `set`. Opened readers join offline so
/// the following probe decides when they take traffic.
async fn open_deferred<C: Connection>(set: &NodeSet<C>) {
    let Some(opener) = set.opener() else {
        return;
    };
    let pending = set.take_deferred();
    if pending.is_empty() {
        return;
    }

    let results = join_all(pending.iter().map(|d| (**opener)(d.config.clone()))).await;

    let mut still_pending = Vec::new();
    for (deferred, result) in pending.into_iter().zip(results) {
        match result {
            Ok(conn) => {
                tracing::info!(
                    database = %set.database(),
                    node = %deferred.config.address(),
                    "Opened deferred reader"
                );
                let reader = open_reader(&deferred.config, conn);
                reader.mark_offline();
                set.install_reader(deferred.slot, reader);
            }
            Err(e) => {
                tracing::error!(
                    database = %set.database(),
                    node = %deferred.config.address(),
                    error = %e,
                    "Reader still cannot be opened"
                );
                still_pending.push(deferred);
            }
        }
    }
    set.restore_deferred(still_pending);
}

fn open_reader<C>(config: &NodeConfig, conn: C) -> Node<C> {
    Node::new(config.host.clone(), config.port, NodeRole::Reader, conn)
        .with_query_log(QueryLog::from_config(config))
}
