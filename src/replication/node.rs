//! Node abstraction.
//!
//! # Responsibilities
//! - Represent a single physical database connection target
//! - Own the connection handle for that target
//! - Track online flag and query/error counters
//!
//! # Design Decisions
//! - Every mutable field is an atomic; no lock is ever taken on the query path
//! - Counters only grow; `ping_tries` is the one field that resets

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::observability::QueryLog;

/// Whether the node receives writes or reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Writer,
    Reader,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Writer => "writer",
            NodeRole::Reader => "reader",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of one node's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeStatistics {
    pub online: bool,
    pub query_count: u64,
    pub error_count: u64,
    pub connection_error_count: u64,
    pub ping_tries: u32,
}

/// One database server, its handle and its health.
pub struct Node<C> {
    host: String,
    port: u16,
    /// Pre-calculated `host:port`.
    name: String,
    role: NodeRole,
    /// Registration index among the readers of its set.
    slot: usize,
    conn: Arc<C>,
    query_log: QueryLog,

    online: AtomicBool,
    /// Queries routed to this node.
    query_count: AtomicU64,
    /// Query failures attributed to this node.
    error_count: AtomicU64,
    /// Failed probes.
    connection_error_count: AtomicU64,
    /// Consecutive failed probes since the last success.
    ping_tries: AtomicU32,
}

impl<C> Node<C> {
    /// Create a new node. It starts online.
    pub fn new(host: impl Into<String>, port: u16, role: NodeRole, conn: C) -> Self {
        let host = host.into();
        let name = format!("{}:{}", host, port);
        Self {
            host,
            port,
            name,
            role,
            slot: 0,
            conn: Arc::new(conn),
            query_log: QueryLog::default(),
            online: AtomicBool::new(true),
            query_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            connection_error_count: AtomicU64::new(0),
            ping_tries: AtomicU32::new(0),
        }
    }

    pub fn with_query_log(mut self, query_log: QueryLog) -> Self {
        self.query_log = query_log;
        self
    }

    pub(crate) fn with_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn query_log(&self) -> &QueryLog {
        &self.query_log
    }

    /// The handle owned by this node.
    pub fn connection(&self) -> &Arc<C> {
        &self.conn
    }

    pub fn matches(&self, host: &str, port: u16) -> bool {
        self.port == port && self.host == host
    }

    // --- Health ---

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Flip to online. Returns true if the node was offline before.
    pub fn mark_online(&self) -> bool {
        !self.online.swap(true, Ordering::AcqRel)
    }

    /// Flip to offline. Returns true if the node was online before.
    pub fn mark_offline(&self) -> bool {
        self.online.swap(false, Ordering::AcqRel)
    }

    /// Report a successful probe.
    pub fn record_probe_success(&self) {
        self.ping_tries.store(0, Ordering::Relaxed);
    }

    /// Report a failed probe.
    pub fn record_probe_failure(&self) {
        self.ping_tries.fetch_add(1, Ordering::Relaxed);
        self.connection_error_count.fetch_add(1, Ordering::Relaxed);
    }

    // --- Counters ---

    pub fn record_query(&self) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn connection_error_count(&self) -> u64 {
        self.connection_error_count.load(Ordering::Relaxed)
    }

    pub fn ping_tries(&self) -> u32 {
        self.ping_tries.load(Ordering::Relaxed)
    }

    /// Read every counter. Fields are loaded one by one, not as a single instant.
    pub fn statistics(&self) -> NodeStatistics {
        NodeStatistics {
            online: self.is_online(),
            query_count: self.query_count(),
            error_count: self.error_count(),
            connection_error_count: self.connection_error_count(),
            ping_tries: self.ping_tries(),
        }
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("online", &self.is_online())
            .field("query_count", &self.query_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_identity() {
        let node = Node::new("db1", 5432, NodeRole::Reader, ());
        assert_eq!(node.name(), "db1:5432");
        assert!(node.matches("db1", 5432));
        assert!(!node.matches("db1", 5433));
        assert!(node.is_online());
    }

    #[test]
    fn test_online_transitions() {
        let node = Node::new("db1", 5432, NodeRole::Reader, ());
        assert!(!node.mark_online(), "already online");
        assert!(node.mark_offline());
        assert!(!node.mark_offline(), "already offline");
        assert!(node.mark_online());
    }

    #[test]
    fn test_probe_counters() {
        let node = Node::new("db1", 5432, NodeRole::Writer, ());
        node.record_probe_failure();
        node.record_probe_failure();
        assert_eq!(node.ping_tries(), 2);
        assert_eq!(node.connection_error_count(), 2);

        node.record_probe_success();
        assert_eq!(node.ping_tries(), 0);
        assert_eq!(node.connection_error_count(), 2, "never reset");
    }

    #[test]
    fn test_concurrent_query_count() {
        let node = Arc::new(Node::new("db1", 5432, NodeRole::Reader, ()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let node = node.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        node.record_query();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(node.query_count(), 8000);
    }
}
