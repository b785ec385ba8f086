//! TCP reachability connector.
//!
//! Stands in for a database driver: the handle remembers the node address and
//! a ping is a fresh TCP connect. Used by the `replica-router` binary to watch
//! real hosts without linking a SQL driver.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

use crate::config::NodeConfig;
use crate::error::ConnectionError;
use crate::net::connection::{Connection, Connector};

/// A handle whose ping opens and drops a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpConnection {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnection {
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn ping(&self) -> Result<(), ConnectionError> {
        match time::timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Io(e)),
            Err(_) => Err(ConnectionError::Timeout(self.connect_timeout)),
        }
    }
}

/// Builds [`TcpConnection`] handles.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn open(&self, config: &NodeConfig) -> Result<Self::Conn, ConnectionError> {
        tracing::debug!(dsn = %config.redacted_dsn(), "Opening TCP probe handle");
        Ok(TcpConnection {
            address: config.address(),
            connect_timeout: self.connect_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn ping_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = TcpConnector::new(Duration::from_millis(500));
        let conn = connector.open(&NodeConfig::new("127.0.0.1", port)).await.unwrap();
        assert_eq!(conn.address(), format!("127.0.0.1:{}", port));
        assert!(conn.ping().await.is_ok());

        drop(listener);
        assert!(conn.ping().await.is_err());
    }
}
