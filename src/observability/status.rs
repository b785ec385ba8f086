//! Status report and periodic status logging.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time;

use crate::net::Connection;
use crate::observability::statistics::NodeEntry;
use crate::replication::{DatabaseRegistry, NodeSet};

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub database: String,
    pub reconnector_active: bool,
    pub nodes: Vec<NodeEntry>,
}

/// Report of every node of every database.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub databases: Vec<DatabaseStatus>,
}

impl Status {
    pub fn capture<'a, C: 'a>(sets: impl Iterator<Item = &'a NodeSet<C>>) -> Self {
        Self {
            databases: sets
                .map(|set| DatabaseStatus {
                    database: set.database().to_string(),
                    reconnector_active: set.reconnector_active(),
                    nodes: NodeEntry::capture_all(set),
                })
                .collect(),
        }
    }

    /// Number of nodes currently offline, over all databases.
    pub fn offline_count(&self) -> usize {
        self.databases
            .iter()
            .flat_map(|d| d.nodes.iter())
            .filter(|n| !n.stats.online)
            .count()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for db in &self.databases {
            for node in &db.nodes {
                writeln!(
                    f,
                    "STATUS {}\t{}\t{}\t{}\tqueries: {}\terrors: {}\tconnection errors: {}\tping tries: {}",
                    db.database,
                    node.role.as_str().to_uppercase(),
                    node.node,
                    if node.stats.online { "online" } else { "offline" },
                    node.stats.query_count,
                    node.stats.error_count,
                    node.stats.connection_error_count,
                    node.stats.ping_tries,
                )?;
            }
        }
        Ok(())
    }
}

/// Log every node's status at `interval` until the registry closes or is dropped.
pub fn spawn_status_logger<C: Connection>(
    registry: &Arc<DatabaseRegistry<C>>,
    interval: Duration,
) -> JoinHandle<()> {
    let weak: Weak<DatabaseRegistry<C>> = Arc::downgrade(registry);
    let mut shutdown = registry.shutdown().subscribe();

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }
            let Some(registry) = weak.upgrade() else { break };
            let status = registry.status();
            let offline = status.offline_count();
            if offline > 0 {
                tracing::warn!(offline, "Nodes offline");
            }
            for db in status.databases {
                for node in db.nodes {
                    tracing::info!(
                        database = %db.database,
                        label = %node.label,
                        node = %node.node,
                        online = node.stats.online,
                        queries = node.stats.query_count,
                        errors = node.stats.error_count,
                        connection_errors = node.stats.connection_error_count,
                        "Node status"
                    );
                }
            }
        }
        tracing::debug!("Status logger stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::{Node, NodeRole};

    #[test]
    fn test_display_has_one_line_per_node() {
        let mut set = NodeSet::new("admin", Node::new("w", 9000, NodeRole::Writer, ()));
        set.push_reader(Node::new("r", 9001, NodeRole::Reader, ()));
        set.readers()[0].mark_offline();

        let status = Status::capture(std::iter::once(&set));
        let text = status.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WRITER") && lines[0].contains("w:9000") && lines[0].contains("online"));
        assert!(lines[1].contains("READER") && lines[1].contains("offline"));
        assert_eq!(status.offline_count(), 1);
    }
}
