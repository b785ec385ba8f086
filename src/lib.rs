//! Replica-aware query router.
//!
//! Sends every query of a logical database to the right connection: writes to
//! the writer, reads spread over online readers, with the writer taking reads
//! when no reader is left. Failed connections are detected from query errors
//! and brought back by a per-database reconnection loop.
//!
//! ```no_run
//! use replica_router::config::{NodeConfig, ReplicationConfig, RouterConfig};
//! use replica_router::net::tcp::TcpConnector;
//! use replica_router::{Connection, DatabaseRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RouterConfig::default();
//! config.databases.insert(
//!     "admin".into(),
//!     ReplicationConfig::with_writer(NodeConfig::new("db-w", 5432))
//!         .reader(NodeConfig::new("db-r1", 5432)),
//! );
//!
//! let connector = Arc::new(TcpConnector::new(Duration::from_secs(1)));
//! let registry = DatabaseRegistry::connect(&config, connector).await?;
//! let admin = registry.use_db("admin")?;
//! admin.read(|conn| async move { conn.ping().await }).await?;
//! println!("{}", registry.status());
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod replication;

pub use config::schema::RouterConfig;
pub use dispatch::{Gateway, Operation, OperationKind, Transaction};
pub use error::{ConnectionError, RouterError, RouterResult};
pub use lifecycle::Shutdown;
pub use net::{Connection, Connector};
pub use replication::{DatabaseRegistry, Node, NodeRole, NodeSet};
