//! Database registry.
//!
//! # Responsibilities
//! - Build one node set per configured database
//! - Resolve database names to gateways and host/port pairs to nodes
//! - Own the background machinery (health monitor, shutdown) for all sets

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::{HealthCheckConfig, NodeConfig, RouterConfig};
use crate::dispatch::{Dispatcher, Gateway};
use crate::error::{ConnectionError, RouterError, RouterResult};
use crate::health::probe::probe;
use crate::health::HealthMonitor;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{LoadBalancer, RandomHealthy};
use crate::net::{self, Connection, Connector};
use crate::observability::{metrics, QueryLog};
use crate::observability::statistics::Statistics;
use crate::observability::status::Status;
use crate::replication::node::{Node, NodeRole};
use crate::replication::node_set::NodeSet;

/// Named collection of node sets. Populated once, read-only afterwards.
pub struct DatabaseRegistry<C> {
    sets: BTreeMap<String, Arc<NodeSet<C>>>,
    dispatcher: Arc<Dispatcher<C>>,
    monitor: Arc<HealthMonitor>,
    shutdown: Shutdown,
}

impl<C: Connection> DatabaseRegistry<C> {
    /// Validate the configuration, then open and probe every configured node.
    ///
    /// A database without a writer, or a writer that cannot be opened or
    /// reached, aborts construction. Readers never do: one that cannot be
    /// opened is deferred, one that cannot be reached starts offline, and both
    /// are handed to the reconnection loop.
    pub async fn connect<K>(config: &RouterConfig, connector: Arc<K>) -> RouterResult<Self>
    where
        K: Connector<Conn = C> + 'static,
    {
        if let Err(errors) = validate_config(config) {
            for e in &errors {
                tracing::error!(field = %e.field, "{}", e.message);
            }
            return Err(invalid_config(&errors));
        }

        let timeout = config.health_check.probe_timeout();
        let opener = net::opener(connector.clone());
        let mut sets = Vec::with_capacity(config.databases.len());

        for (database, replication) in &config.databases {
            let writer_conf = replication.writer.as_ref().ok_or_else(|| {
                tracing::error!(database = %database, "No writer defined");
                RouterError::Configuration {
                    database: database.clone(),
                    reason: "no writer defined".to_string(),
                }
            })?;

            let writer = open_node(database, writer_conf, NodeRole::Writer, &*connector)
                .await
                .map_err(|e| RouterError::Configuration {
                    database: database.clone(),
                    reason: format!("cannot open writer {}: {}", writer_conf.address(), e),
                })?;
            if let Err(e) = probe(database, &writer, timeout).await {
                tracing::error!(
                    database = %database,
                    node = %writer.name(),
                    error = %e,
                    "Writer connection error"
                );
                return Err(RouterError::Connection {
                    database: database.clone(),
                    node: writer.name().to_string(),
                    source: e,
                });
            }
            tracing::info!(database = %database, node = %writer.name(), "Connected writer");
            let mut set = NodeSet::new(database.clone(), writer);
            set.set_opener(opener.clone());

            for reader_conf in &replication.readers {
                let reader = match open_node(database, reader_conf, NodeRole::Reader, &*connector).await {
                    Ok(reader) => reader,
                    Err(_) => {
                        tracing::warn!(
                            database = %database,
                            node = %reader_conf.address(),
                            "Reader deferred to the reconnection loop"
                        );
                        set.defer_reader(reader_conf.clone());
                        continue;
                    }
                };
                match probe(database, &reader, timeout).await {
                    Ok(()) => {
                        tracing::info!(database = %database, node = %reader.name(), "Connected reader");
                    }
                    Err(e) => {
                        reader.mark_offline();
                        tracing::error!(
                            database = %database,
                            node = %reader.name(),
                            error = %e,
                            "Reader connection error, starting offline"
                        );
                    }
                }
                set.push_reader(reader);
            }

            sets.push(set);
        }

        let registry = Self::from_node_sets(sets, config.health_check.clone());
        for set in registry.sets.values() {
            for node in set.nodes() {
                metrics::record_node_online(set.database(), node.name(), node.is_online());
            }
            if !set.all_online() {
                registry.monitor.arm(set);
            }
        }
        Ok(registry)
    }

    /// Assemble a registry from prebuilt sets with the default balancer.
    pub fn from_node_sets(sets: Vec<NodeSet<C>>, health: HealthCheckConfig) -> Self {
        Self::with_balancer(sets, health, Arc::new(RandomHealthy::new()))
    }

    /// Assemble a registry with a custom read balancer.
    pub fn with_balancer(
        sets: Vec<NodeSet<C>>,
        health: HealthCheckConfig,
        balancer: Arc<dyn LoadBalancer<C>>,
    ) -> Self {
        let shutdown = Shutdown::new();
        let monitor = Arc::new(HealthMonitor::new(health, shutdown.clone()));
        let dispatcher = Arc::new(Dispatcher::new(balancer, monitor.clone()));

        let mut by_name = BTreeMap::new();
        for set in sets {
            let name = set.database().to_string();
            if by_name.insert(name.clone(), Arc::new(set)).is_some() {
                tracing::warn!(database = %name, "Duplicate database name, keeping the last one");
            }
        }

        Self {
            sets: by_name,
            dispatcher,
            monitor,
            shutdown,
        }
    }

    /// Gateway of the database registered under `name`.
    pub fn use_db(&self, name: &str) -> RouterResult<Gateway<C>> {
        let set = self.sets.get(name).ok_or_else(|| {
            tracing::error!(database = %name, "No datasource known");
            RouterError::NotFound(name.to_string())
        })?;

        if !set.gateway_open() {
            tracing::error!(database = %name, "No gateway found");
            return Err(RouterError::NoGateway(name.to_string()));
        }

        Ok(Gateway::new(set.clone(), self.dispatcher.clone()))
    }

    /// Best-effort lookup of a node by address. Unknown names and addresses
    /// yield `None`.
    pub fn use_node(&self, name: &str, host: &str, port: u16) -> Option<Arc<Node<C>>> {
        self.sets.get(name)?.find(host, port)
    }

    pub fn node_set(&self, name: &str) -> Option<&Arc<NodeSet<C>>> {
        self.sets.get(name)
    }

    /// Database names in sorted order.
    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Counter snapshot of every node.
    pub fn statistics(&self) -> Statistics {
        Statistics::capture(self.sets.values().map(|s| s.as_ref()))
    }

    /// Human-readable/serializable report of every node.
    pub fn status(&self) -> Status {
        Status::capture(self.sets.values().map(|s| s.as_ref()))
    }

    /// Stop background loops and refuse new gateways.
    pub fn close(&self) {
        if self.shutdown.is_triggered() {
            return;
        }
        for set in self.sets.values() {
            set.close_gateway();
        }
        self.shutdown.trigger();
        tracing::info!("Database registry closed");
    }
}

impl<C> Drop for DatabaseRegistry<C> {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn open_node<K: Connector>(
    database: &str,
    config: &NodeConfig,
    role: NodeRole,
    connector: &K,
) -> Result<Node<K::Conn>, ConnectionError> {
    match connector.open(config).await {
        Ok(conn) => Ok(Node::new(config.host.clone(), config.port, role, conn)
            .with_query_log(QueryLog::from_config(config))),
        Err(e) => {
            tracing::error!(
                database = %database,
                node = %config.address(),
                role = %role,
                error = %e,
                "Failed to open connection handle"
            );
            Err(e)
        }
    }
}

/// Fold validation errors into one configuration error, attributed to the
/// first database named in them (`*` for global settings).
fn invalid_config(errors: &[ValidationError]) -> RouterError {
    let database = errors
        .iter()
        .find_map(|e| e.field.strip_prefix("databases.")?.split('.').next())
        .unwrap_or("*")
        .to_string();
    let reason = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    RouterError::Configuration { database, reason }
}
