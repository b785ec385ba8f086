//! Router-level error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by registry construction and lookup.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The configuration cannot describe a servable database (e.g. no writer).
    #[error("configuration error on database '{database}': {reason}")]
    Configuration { database: String, reason: String },

    /// A writer could not be reached while building the registry.
    #[error("connection error on database '{database}' ({node}): {source}")]
    Connection {
        database: String,
        node: String,
        #[source]
        source: ConnectionError,
    },

    /// No node set is registered under the requested name.
    #[error("no datasource '{0}' known")]
    NotFound(String),

    /// The node set exists but its writer handle is not available.
    #[error("no gateway found at '{0}'")]
    NoGateway(String),
}

/// Failures reported by a connection handle or its connector.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Underlying socket error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The probe did not finish within its deadline.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// The server or driver refused the connection.
    #[error("connection refused: {0}")]
    Refused(String),
}

pub type RouterResult<T> = Result<T, RouterError>;
