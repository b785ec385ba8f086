//! Connection handle abstraction.
//!
//! # Responsibilities
//! - Describe the only thing the router needs from a driver: a cheap ping
//! - Describe how handles are opened from a node descriptor
//!
//! # Design Decisions
//! - `open` is lazy: it builds the handle and may succeed without reaching the
//!   server. Reachability is decided by the first `ping`.
//! - Handles are shared as `Arc<C>` so an operation can hold the one it is
//!   bound to while the node keeps ownership.
//! - Node sets keep a type-erased [`Opener`] so the reconnection loop can
//!   retry descriptors whose first `open` failed.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::config::NodeConfig;
use crate::error::ConnectionError;

/// A pingable handle to one backend.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Lightweight liveness check.
    async fn ping(&self) -> Result<(), ConnectionError>;
}

/// Opens connection handles from node descriptors.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    async fn open(&self, config: &NodeConfig) -> Result<Self::Conn, ConnectionError>;
}

/// Type-erased [`Connector::open`], owned by node sets with deferred readers.
pub type Opener<C> = Arc<dyn Fn(NodeConfig) -> BoxFuture<'static, Result<C, ConnectionError>> + Send + Sync>;

/// Wrap `connector` into an [`Opener`].
pub fn opener<K>(connector: Arc<K>) -> Opener<K::Conn>
where
    K: Connector + 'static,
{
    Arc::new(move |config: NodeConfig| {
        let connector = connector.clone();
        let open: BoxFuture<'static, Result<K::Conn, ConnectionError>> =
            Box::pin(async move { connector.open(&config).await });
        open
    })
}
