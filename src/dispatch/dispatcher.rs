//! Before/after query hooks.
//!
//! # Responsibilities
//! - Before: choose the node for an operation and bind it there
//! - After: hand failed operations to the health monitor
//!
//! # Design Decisions
//! - Transactions are never rebound; their failures are reported once, when
//!   the transaction finishes
//! - Counting happens on the chosen node right after selection
//! - A read with no online reader stays on the writer instead of failing

use std::sync::Arc;

use crate::dispatch::operation::{Operation, OperationKind};
use crate::health::HealthMonitor;
use crate::load_balancer::LoadBalancer;
use crate::net::Connection;
use crate::observability::metrics;
use crate::replication::NodeSet;

pub struct Dispatcher<C> {
    balancer: Arc<dyn LoadBalancer<C>>,
    monitor: Arc<HealthMonitor>,
}

impl<C: Connection> Dispatcher<C> {
    pub fn new(balancer: Arc<dyn LoadBalancer<C>>, monitor: Arc<HealthMonitor>) -> Self {
        Self { balancer, monitor }
    }

    /// Pick the target node for `op` and rebind it.
    pub fn before(&self, set: &NodeSet<C>, op: &mut Operation<C>) {
        if op.is_transaction() {
            return;
        }

        let target = match op.kind() {
            OperationKind::Write => set.writer().clone(),
            OperationKind::Read => match self.balancer.next_reader(&set.readers()) {
                Some(reader) => reader,
                None => {
                    if !set.readers().is_empty() {
                        tracing::debug!(database = %set.database(), "No online reader, routing read to writer");
                    }
                    set.writer().clone()
                }
            },
        };

        target.record_query();
        metrics::record_query(set.database(), target.name(), target.role());
        op.rebind(target);
    }

    /// Inspect the outcome of `op` and update health state on failure.
    pub async fn after(&self, set: &Arc<NodeSet<C>>, op: &Operation<C>) {
        if op.is_transaction() {
            return;
        }
        let Some(error) = op.error() else {
            return;
        };

        tracing::warn!(
            database = %set.database(),
            node = %op.node().name(),
            error = %error,
            "Checking node health after failed query"
        );
        self.monitor.on_query_failure(set, op.node()).await;
    }

    /// Report a transaction that ended with `failures` failed operations.
    /// Transactions always run on the writer.
    pub async fn after_transaction(&self, set: &Arc<NodeSet<C>>, failures: u64) {
        if failures == 0 {
            return;
        }
        tracing::warn!(
            database = %set.database(),
            node = %set.writer().name(),
            failures,
            "Checking writer health after failed transaction"
        );
        self.monitor.on_query_failure(set, set.writer()).await;
    }
}
