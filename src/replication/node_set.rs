//! Replication set: one writer and its readers.
//!
//! Readers whose handle could not be opened at startup are kept as deferred
//! descriptors. The reconnection loop opens them later and slots them back
//! in registration order.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::{ArcSwap, Guard};

use crate::config::NodeConfig;
use crate::net::Opener;
use crate::replication::node::{Node, NodeRole};

/// Reader descriptor waiting for a successful `open`.
#[derive(Debug, Clone)]
pub struct DeferredReader {
    pub slot: usize,
    pub config: NodeConfig,
}

/// All nodes serving one logical database.
pub struct NodeSet<C> {
    database: String,
    writer: Arc<Node<C>>,
    /// Opened readers, ordered by slot. Swapped whole when a deferred reader
    /// joins so the query path never locks.
    readers: ArcSwap<Vec<Arc<Node<C>>>>,
    deferred: Mutex<Vec<DeferredReader>>,
    next_slot: usize,
    opener: Option<Opener<C>>,
    /// Set while a reconnection loop runs for this set.
    reconnector_active: AtomicBool,
    /// Cleared when the owning registry is closed.
    gateway_open: AtomicBool,
}

impl<C> NodeSet<C> {
    /// Create a set around its mandatory writer.
    pub fn new(database: impl Into<String>, writer: Node<C>) -> Self {
        debug_assert_eq!(writer.role(), NodeRole::Writer);
        Self {
            database: database.into(),
            writer: Arc::new(writer),
            readers: ArcSwap::from_pointee(Vec::new()),
            deferred: Mutex::new(Vec::new()),
            next_slot: 0,
            opener: None,
            reconnector_active: AtomicBool::new(false),
            gateway_open: AtomicBool::new(true),
        }
    }

    /// Append a reader, keeping registration order.
    pub fn push_reader(&mut self, reader: Node<C>) {
        debug_assert_eq!(reader.role(), NodeRole::Reader);
        let reader = Arc::new(reader.with_slot(self.next_slot));
        self.next_slot += 1;
        self.readers.rcu(|current| {
            let mut readers = Vec::clone(current);
            readers.push(reader.clone());
            readers
        });
    }

    /// Register a reader whose handle is not available yet. It takes the next
    /// slot and is opened by the reconnection loop through the set's opener.
    pub fn defer_reader(&mut self, config: NodeConfig) {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.lock_deferred().push(DeferredReader { slot, config });
    }

    pub fn set_opener(&mut self, opener: Opener<C>) {
        self.opener = Some(opener);
    }

    pub fn opener(&self) -> Option<&Opener<C>> {
        self.opener.as_ref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn writer(&self) -> &Arc<Node<C>> {
        &self.writer
    }

    /// Opened readers in registration order.
    pub fn readers(&self) -> Guard<Arc<Vec<Arc<Node<C>>>>> {
        self.readers.load()
    }

    /// Owned copy of the reader list, safe to keep across await points.
    pub fn reader_snapshot(&self) -> Arc<Vec<Arc<Node<C>>>> {
        self.readers.load_full()
    }

    /// Deferred readers, in registration order.
    pub fn deferred_readers(&self) -> Vec<DeferredReader> {
        self.lock_deferred().clone()
    }

    pub fn has_deferred_readers(&self) -> bool {
        !self.lock_deferred().is_empty()
    }

    /// Writer first, then opened readers in registration order.
    pub fn nodes(&self) -> Vec<Arc<Node<C>>> {
        let readers = self.readers.load();
        let mut nodes = Vec::with_capacity(readers.len() + 1);
        nodes.push(self.writer.clone());
        nodes.extend(readers.iter().cloned());
        nodes
    }

    /// Linear scan of writer then readers.
    pub fn find(&self, host: &str, port: u16) -> Option<Arc<Node<C>>> {
        if self.writer.matches(host, port) {
            return Some(self.writer.clone());
        }
        self.readers.load().iter().find(|n| n.matches(host, port)).cloned()
    }

    /// Every node is opened and online.
    pub fn all_online(&self) -> bool {
        self.writer.is_online()
            && self.readers.load().iter().all(|n| n.is_online())
            && !self.has_deferred_readers()
    }

    /// True if there is at least one reader and none of them is online.
    pub fn all_readers_offline(&self) -> bool {
        let readers = self.readers.load();
        (!readers.is_empty() || self.has_deferred_readers()) && readers.iter().all(|n| !n.is_online())
    }

    /// Take the deferred readers out for an open attempt. Whatever fails goes
    /// back through [`restore_deferred`](Self::restore_deferred).
    pub(crate) fn take_deferred(&self) -> Vec<DeferredReader> {
        std::mem::take(&mut *self.lock_deferred())
    }

    pub(crate) fn restore_deferred(&self, pending: Vec<DeferredReader>) {
        let mut deferred = self.lock_deferred();
        deferred.extend(pending);
        deferred.sort_by_key(|d| d.slot);
    }

    /// Slot a freshly opened reader into place.
    pub(crate) fn install_reader(&self, slot: usize, reader: Node<C>) {
        debug_assert_eq!(reader.role(), NodeRole::Reader);
        let reader = Arc::new(reader.with_slot(slot));
        self.readers.rcu(|current| {
            let mut readers = Vec::clone(current);
            readers.push(reader.clone());
            readers.sort_by_key(|n| n.slot());
            readers
        });
    }

    fn lock_deferred(&self) -> MutexGuard<'_, Vec<DeferredReader>> {
        self.deferred.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- Reconnector guard ---

    /// Try to become the single reconnection loop of this set.
    pub fn try_claim_reconnector(&self) -> bool {
        self.reconnector_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release_reconnector(&self) {
        self.reconnector_active.store(false, Ordering::Release);
    }

    pub fn reconnector_active(&self) -> bool {
        self.reconnector_active.load(Ordering::Acquire)
    }

    // --- Gateway ---

    pub fn gateway_open(&self) -> bool {
        self.gateway_open.load(Ordering::Acquire)
    }

    pub(crate) fn close_gateway(&self) {
        self.gateway_open.store(false, Ordering::Release);
    }
}

impl<C> fmt::Debug for NodeSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSet")
            .field("database", &self.database)
            .field("writer", &self.writer)
            .field("readers", &self.readers.load().len())
            .field("deferred", &self.lock_deferred().len())
            .field("reconnector_active", &self.reconnector_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with_readers(n: u16) -> NodeSet<()> {
        let mut set = NodeSet::new("admin", Node::new("w", 9000, NodeRole::Writer, ()));
        for i in 0..n {
            set.push_reader(Node::new("r", 9001 + i, NodeRole::Reader, ()));
        }
        set
    }

    #[test]
    fn test_find_scans_writer_and_readers() {
        let set = set_with_readers(2);
        assert_eq!(set.find("w", 9000).unwrap().role(), NodeRole::Writer);
        assert_eq!(set.find("r", 9002).unwrap().name(), "r:9002");
        assert!(set.find("r", 9999).is_none());
    }

    #[test]
    fn test_reconnector_claim_is_exclusive() {
        let set = set_with_readers(1);
        assert!(set.try_claim_reconnector());
        assert!(!set.try_claim_reconnector());
        set.release_reconnector();
        assert!(set.try_claim_reconnector());
    }

    #[test]
    fn test_reader_offline_detection() {
        let set = set_with_readers(2);
        assert!(!set.all_readers_offline());
        set.readers()[0].mark_offline();
        assert!(!set.all_readers_offline());
        set.readers()[1].mark_offline();
        assert!(set.all_readers_offline());
        assert!(!set.all_online());

        let empty = set_with_readers(0);
        assert!(!empty.all_readers_offline());
    }

    #[test]
    fn test_deferred_reader_keeps_its_slot() {
        let mut set = set_with_readers(0);
        set.defer_reader(NodeConfig::new("r", 9001));
        set.push_reader(Node::new("r", 9002, NodeRole::Reader, ()));

        assert!(!set.all_online(), "deferred reader counts as offline");
        assert_eq!(set.readers().len(), 1);
        assert_eq!(set.readers()[0].slot(), 1);

        let pending = set.take_deferred();
        assert_eq!(pending.len(), 1);
        assert!(!set.has_deferred_readers());
        set.install_reader(pending[0].slot, Node::new("r", 9001, NodeRole::Reader, ()));

        let readers = set.readers();
        assert_eq!(readers.iter().map(|r| r.name()).collect::<Vec<_>>(), ["r:9001", "r:9002"]);
        assert!(set.all_online());
    }

    #[test]
    fn test_only_deferred_readers_count_as_all_offline() {
        let mut set = set_with_readers(0);
        set.defer_reader(NodeConfig::new("r", 9001));
        assert!(set.all_readers_offline());

        let pending = set.take_deferred();
        set.restore_deferred(pending);
        assert_eq!(set.deferred_readers()[0].slot, 0);
    }
}
