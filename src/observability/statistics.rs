//! Counter snapshots.
//!
//! Each field is read on its own, so a snapshot is not one atomic instant
//! across nodes. Statistics are advisory.

use std::collections::BTreeMap;

use serde::ser::{Serialize, Serializer};

use crate::replication::{NodeRole, NodeSet, NodeStatistics};

/// One node inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NodeEntry {
    /// `write`, `read0`, `read1`, ...
    pub label: String,
    /// `host:port`.
    pub node: String,
    pub role: NodeRole,
    #[serde(flatten)]
    pub stats: NodeStatistics,
}

impl NodeEntry {
    /// Label every node of `set`: the writer first, readers by registration
    /// slot. Deferred readers appear offline with zero counters.
    pub fn capture_all<C>(set: &NodeSet<C>) -> Vec<NodeEntry> {
        let writer = set.writer();
        let readers = set.readers();
        let deferred = set.deferred_readers();

        let mut slotted: Vec<(usize, NodeEntry)> = readers
            .iter()
            .map(|reader| {
                (
                    reader.slot(),
                    NodeEntry {
                        label: String::new(),
                        node: reader.name().to_string(),
                        role: reader.role(),
                        stats: reader.statistics(),
                    },
                )
            })
            .collect();
        slotted.extend(deferred.into_iter().map(|d| {
            (
                d.slot,
                NodeEntry {
                    label: String::new(),
                    node: d.config.address(),
                    role: NodeRole::Reader,
                    stats: NodeStatistics::default(),
                },
            )
        }));
        slotted.sort_by_key(|(slot, _)| *slot);

        let mut entries = Vec::with_capacity(slotted.len() + 1);
        entries.push(NodeEntry {
            label: "write".to_string(),
            node: writer.name().to_string(),
            role: writer.role(),
            stats: writer.statistics(),
        });
        entries.extend(slotted.into_iter().map(|(slot, mut entry)| {
            entry.label = format!("read{}", slot);
            entry
        }));
        entries
    }
}

/// Snapshot of one node set, keyed by label in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSetStatistics {
    entries: Vec<NodeEntry>,
}

impl NodeSetStatistics {
    pub fn capture<C>(set: &NodeSet<C>) -> Self {
        Self {
            entries: NodeEntry::capture_all(set),
        }
    }

    pub fn get(&self, label: &str) -> Option<&NodeStatistics> {
        self.entries.iter().find(|e| e.label == label).map(|e| &e.stats)
    }

    pub fn writer(&self) -> Option<&NodeStatistics> {
        self.get("write")
    }

    pub fn entries(&self) -> &[NodeEntry] {
        &self.entries
    }

    /// Sum of `query_count` over all readers.
    pub fn reader_query_count(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.role == NodeRole::Reader)
            .map(|e| e.stats.query_count)
            .sum()
    }
}

impl Serialize for NodeSetStatistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|e| (&e.label, e)))
    }
}

/// Snapshot of every registered database.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Statistics {
    databases: BTreeMap<String, NodeSetStatistics>,
}

impl Statistics {
    pub fn capture<'a, C: 'a>(sets: impl Iterator<Item = &'a NodeSet<C>>) -> Self {
        Self {
            databases: sets
                .map(|set| (set.database().to_string(), NodeSetStatistics::capture(set)))
                .collect(),
        }
    }

    pub fn database(&self, name: &str) -> Option<&NodeSetStatistics> {
        self.databases.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeSetStatistics)> {
        self.databases.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::replication::Node;

    fn sample_set() -> NodeSet<()> {
        let mut set = NodeSet::new("admin", Node::new("w", 9000, NodeRole::Writer, ()));
        set.push_reader(Node::new("r", 9001, NodeRole::Reader, ()));
        set.push_reader(Node::new("r", 9002, NodeRole::Reader, ()));
        set
    }

    #[test]
    fn test_labels_follow_registration_order() {
        let set = sample_set();
        set.readers()[1].record_query();
        set.readers()[1].record_query();
        set.writer().record_error();

        let stats = NodeSetStatistics::capture(&set);
        let labels: Vec<_> = stats.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["write", "read0", "read1"]);
        assert_eq!(stats.get("read1").unwrap().query_count, 2);
        assert_eq!(stats.writer().unwrap().error_count, 1);
        assert_eq!(stats.reader_query_count(), 2);
        assert!(stats.get("read2").is_none());
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let set = sample_set();
        set.readers()[0].mark_offline();
        let stats = Statistics::capture(std::iter::once(&set));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["admin"]["read0"]["online"], false);
        assert_eq!(json["admin"]["write"]["node"], "w:9000");
        assert_eq!(json["admin"]["read1"]["role"], "reader");

        let text = serde_json::to_string(&stats).unwrap();
        assert!(text.find("\"write\"").unwrap() < text.find("\"read0\"").unwrap());
    }

    #[test]
    fn test_deferred_reader_keeps_its_label() {
        let mut set = NodeSet::new("admin", Node::new("w", 9000, NodeRole::Writer, ()));
        set.defer_reader(NodeConfig::new("r", 9001));
        set.push_reader(Node::new("r", 9002, NodeRole::Reader, ()));

        let stats = NodeSetStatistics::capture(&set);
        let labels: Vec<_> = stats.entries().iter().map(|e| (e.label.as_str(), e.node.as_str())).collect();
        assert_eq!(labels, [("write", "w:9000"), ("read0", "r:9001"), ("read1", "r:9002")]);
        assert!(!stats.get("read0").unwrap().online);
        assert!(stats.get("read1").unwrap().online);
    }
}
