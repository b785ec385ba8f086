//! Single-node probe with a deadline.

use std::time::Duration;
use tokio::time;

use crate::error::ConnectionError;
use crate::net::Connection;
use crate::observability::metrics;
use crate::replication::Node;

/// Ping `node` once, bounded by `timeout`, and update its probe counters.
///
/// Does not touch the online flag; callers decide what a result means for
/// routing.
pub async fn probe<C: Connection>(
    database: &str,
    node: &Node<C>,
    timeout: Duration,
) -> Result<(), ConnectionError> {
    let result = match time::timeout(timeout, node.connection().ping()).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout(timeout)),
    };

    match &result {
        Ok(()) => node.record_probe_success(),
        Err(e) => {
            node.record_probe_failure();
            metrics::record_probe_failure(database, node.name());
            tracing::debug!(
                database = %database,
                node = %node.name(),
                ping_tries = node.ping_tries(),
                error = %e,
                "Probe failed"
            );
        }
    }
    result
}
