//! Passive health checking (failure reaction).
//!
//! # Responsibilities
//! - Attribute a failed query to the node that served it
//! - Re-verify that node and every online reader with a fresh probe
//! - Take failing nodes out of rotation and arm the reconnection loop
//!
//! # Design Decisions
//! - The query itself is never retried or suppressed here
//! - All online readers are probed, since a shared outage rarely hits one node
//! - The writer is probed as well once no reader is left, so a degraded
//!   writer shows up in the statistics

use std::sync::Arc;
use futures_util::future::join_all;

use crate::health::active::HealthMonitor;
use crate::health::probe::probe;
use crate::net::Connection;
use crate::observability::metrics;
use crate::replication::{Node, NodeSet};

impl HealthMonitor {
    /// React to a failed query that ran on `used`.
    ///
    /// Returns the number of nodes this call switched offline.
    pub async fn on_query_failure<C: Connection>(
        &self,
        set: &Arc<NodeSet<C>>,
        used: &Arc<Node<C>>,
    ) -> usize {
        let database = set.database();
        used.record_error();
        metrics::record_query_error(database, used.name());

        let readers = set.reader_snapshot();
        let mut suspects: Vec<&Arc<Node<C>>> = vec![used];
        suspects.extend(
            readers
                .iter()
                .filter(|r| r.is_online() && !Arc::ptr_eq(r, used)),
        );

        let mut switched = self.probe_and_evict(database, &suspects).await;

        if set.all_readers_offline() && !Arc::ptr_eq(set.writer(), used) {
            tracing::warn!(database = %database, "All readers offline, checking writer");
            switched += self.probe_and_evict(database, &[set.writer()]).await;
        }

        if !set.all_online() {
            self.arm(set);
        }
        switched
    }

    async fn probe_and_evict<C: Connection>(&self, database: &str, nodes: &[&Arc<Node<C>>]) -> usize {
        let timeout = self.config().probe_timeout();
        let results = join_all(nodes.iter().map(|node| probe(database, node, timeout))).await;

        let mut switched = 0;
        for (node, result) in nodes.iter().zip(results) {
            if let Err(e) = result {
                if node.mark_offline() {
                    switched += 1;
                    metrics::record_node_online(database, node.name(), false);
                    tracing::error!(
                        database = %database,
                        node = %node.name(),
                        role = %node.role(),
                        error = %e,
                        "Ping failed, switching to offline"
                    );
                }
            }
        }
        switched
    }
}
