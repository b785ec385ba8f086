//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use replica_router::config::{HealthCheckConfig, NodeConfig};
use replica_router::{Connection, ConnectionError, Connector, DatabaseRegistry, Node, NodeRole, NodeSet};

/// A connection whose reachability can be flipped from the test.
#[derive(Debug)]
pub struct MockConnection {
    name: String,
    reachable: Arc<AtomicBool>,
    pings: AtomicUsize,
    queries: AtomicUsize,
}

impl MockConnection {
    pub fn new(name: &str) -> Self {
        Self::with_switch(name, Arc::new(AtomicBool::new(true)))
    }

    pub fn with_switch(name: &str, reachable: Arc<AtomicBool>) -> Self {
        Self {
            name: name.to_string(),
            reachable,
            pings: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Pretend to run a query; answers with the node name.
    pub async fn query(&self) -> Result<String, ConnectionError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(self.name.clone())
        } else {
            Err(ConnectionError::Refused(format!("{} closed the connection", self.name)))
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn ping(&self) -> Result<(), ConnectionError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectionError::Refused(format!("{} is down", self.name)))
        }
    }
}

/// Connector handing out mock connections with pre-registered switches.
#[derive(Default)]
pub struct MockConnector {
    switches: Mutex<HashMap<String, Arc<AtomicBool>>>,
    refused: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reachability switch for `host:port`, created reachable.
    pub fn switch(&self, address: &str) -> Arc<AtomicBool> {
        self.switches
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(true)))
            .clone()
    }

    /// Make `open` reject `host:port`.
    pub fn refuse(&self, address: &str) {
        self.refused.lock().unwrap().push(address.to_string());
    }

    /// Let `open` succeed again for `host:port`.
    pub fn accept(&self, address: &str) {
        self.refused.lock().unwrap().retain(|a| a != address);
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn open(&self, config: &NodeConfig) -> Result<MockConnection, ConnectionError> {
        let address = config.address();
        if self.refused.lock().unwrap().contains(&address) {
            return Err(ConnectionError::Refused(address));
        }
        Ok(MockConnection::with_switch(&address, self.switch(&address)))
    }
}

/// Fast loop settings so recovery is observable within a test.
pub fn fast_health() -> HealthCheckConfig {
    HealthCheckConfig {
        reconnect_interval_ms: 50,
        probe_timeout_ms: 20,
    }
}

/// Registry with one database "main": writer "w:9000" and readers "r:9001".. .
pub fn registry(readers: u16) -> DatabaseRegistry<MockConnection> {
    registry_with_health(readers, fast_health())
}

pub fn registry_with_health(readers: u16, health: HealthCheckConfig) -> DatabaseRegistry<MockConnection> {
    let mut set = NodeSet::new("main", Node::new("w", 9000, NodeRole::Writer, MockConnection::new("w:9000")));
    for i in 0..readers {
        let port = 9001 + i;
        set.push_reader(Node::new("r", port, NodeRole::Reader, MockConnection::new(&format!("r:{}", port))));
    }
    DatabaseRegistry::from_node_sets(vec![set], health)
}
