//! Caller-facing handle of one logical database.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::operation::{Operation, OperationKind};
use crate::net::Connection;
use crate::replication::NodeSet;

/// Entry point through which queries of one database are dispatched.
/// Cheap to clone.
pub struct Gateway<C> {
    set: Arc<NodeSet<C>>,
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C> Clone for Gateway<C> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<C: Connection> Gateway<C> {
    pub(crate) fn new(set: Arc<NodeSet<C>>, dispatcher: Arc<Dispatcher<C>>) -> Self {
        Self { set, dispatcher }
    }

    pub fn database(&self) -> &str {
        self.set.database()
    }

    pub fn node_set(&self) -> &Arc<NodeSet<C>> {
        &self.set
    }

    /// New operation, bound to the writer until the before-hook runs.
    pub fn operation(&self, kind: OperationKind) -> Operation<C> {
        Operation::new(kind, self.set.writer().clone())
    }

    /// Hook to invoke before executing `op`.
    pub fn before_query(&self, op: &mut Operation<C>) {
        self.dispatcher.before(&self.set, op);
    }

    /// Hook to invoke after executing `op`.
    pub async fn after_query(&self, op: &Operation<C>) {
        self.dispatcher.after(&self.set, op).await;
    }

    /// Run `f` on the routed connection with both hooks around it.
    ///
    /// The result of `f` is returned unchanged; a failure only feeds the
    /// health state.
    pub async fn execute<F, Fut, T, E>(&self, kind: OperationKind, f: F) -> Result<T, E>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut op = self.operation(kind);
        run(self, &mut op, f).await
    }

    /// Shorthand for `execute(OperationKind::Read, f)`.
    pub async fn read<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute(OperationKind::Read, f).await
    }

    /// Shorthand for `execute(OperationKind::Write, f)`.
    pub async fn write<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute(OperationKind::Write, f).await
    }

    /// Start a transaction pinned to the writer.
    pub fn begin(&self) -> Transaction<C> {
        tracing::debug!(database = %self.database(), node = %self.set.writer().name(), "Transaction started");
        Transaction {
            gateway: self.clone(),
            failures: AtomicU64::new(0),
        }
    }
}

impl<C> fmt::Debug for Gateway<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("database", &self.set.database())
            .finish()
    }
}

/// Operations that must stay on the connection they started on.
///
/// Failures inside the transaction are not probed one by one. They are
/// reported to the health monitor once, by [`finish`](Self::finish). A
/// transaction dropped without `finish` reports nothing.
pub struct Transaction<C> {
    gateway: Gateway<C>,
    failures: AtomicU64,
}

impl<C: Connection> Transaction<C> {
    pub fn connection(&self) -> &Arc<C> {
        self.gateway.set.writer().connection()
    }

    pub fn operation(&self, kind: OperationKind) -> Operation<C> {
        Operation::in_transaction(kind, self.gateway.set.writer().clone())
    }

    /// Run `f` inside the transaction. Hooks are invoked but leave the
    /// operation where it is.
    pub async fn execute<F, Fut, T, E>(&self, kind: OperationKind, f: F) -> Result<T, E>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut op = self.operation(kind);
        let result = run(&self.gateway, &mut op, f).await;
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Number of failed operations so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// End the transaction after the caller committed or rolled back. If any
    /// operation failed, the writer is checked like after a failed query.
    pub async fn finish(self) {
        let failures = self.failures();
        tracing::debug!(
            database = %self.gateway.database(),
            failures,
            "Transaction finished"
        );
        self.gateway
            .dispatcher
            .after_transaction(&self.gateway.set, failures)
            .await;
    }
}

async fn run<C, F, Fut, T, E>(gateway: &Gateway<C>, op: &mut Operation<C>, f: F) -> Result<T, E>
where
    C: Connection,
    F: FnOnce(Arc<C>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    gateway.before_query(op);
    let started = Instant::now();
    let result = f(op.connection().clone()).await;
    let elapsed = started.elapsed();

    let node = op.node().clone();
    match &result {
        Ok(_) => node
            .query_log()
            .record(gateway.database(), node.name(), op.kind(), elapsed, None),
        Err(e) => {
            node.query_log()
                .record(gateway.database(), node.name(), op.kind(), elapsed, Some(e));
            op.fail(e);
        }
    }
    gateway.after_query(op).await;
    result
}
