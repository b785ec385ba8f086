//! Metrics collection and exposition.
//!
//! # Metrics
//! - `replica_router_queries_total` (counter): routed queries by database, node, role
//! - `replica_router_query_errors_total` (counter): failed queries by database, node
//! - `replica_router_probe_failures_total` (counter): failed probes by database, node
//! - `replica_router_node_online` (gauge): 1=online, 0=offline
//!
//! Without an installed recorder every call is a no-op, so the hot path pays
//! nothing in tests or when metrics are disabled.

use std::net::SocketAddr;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::replication::NodeRole;

/// Install the Prometheus recorder and its HTTP listener.
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_query(database: &str, node: &str, role: NodeRole) {
    counter!(
        "replica_router_queries_total",
        "database" => database.to_string(),
        "node" => node.to_string(),
        "role" => role.as_str(),
    )
    .increment(1);
}

pub fn record_query_error(database: &str, node: &str) {
    counter!(
        "replica_router_query_errors_total",
        "database" => database.to_string(),
        "node" => node.to_string(),
    )
    .increment(1);
}

pub fn record_probe_failure(database: &str, node: &str) {
    counter!(
        "replica_router_probe_failures_total",
        "database" => database.to_string(),
        "node" => node.to_string(),
    )
    .increment(1);
}

pub fn record_node_online(database: &str, node: &str, online: bool) {
    gauge!(
        "replica_router_node_online",
        "database" => database.to_string(),
        "node" => node.to_string(),
    )
    .set(if online { 1.0 } else { 0.0 });
}
