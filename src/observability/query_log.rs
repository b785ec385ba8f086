//! Per-query log events.
//!
//! Failed statements are logged at error level, statements slower than the
//! node's threshold at warn, everything else at info or debug depending on
//! the node's `log_query` setting.

use std::fmt;
use std::time::Duration;

use tracing::Level;

use crate::config::NodeConfig;
use crate::dispatch::OperationKind;

/// Query logging settings of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLog {
    log_query: bool,
    /// Zero disables slow-query detection.
    slow_threshold: Duration,
}

impl QueryLog {
    pub fn new(log_query: bool, slow_threshold: Duration) -> Self {
        Self {
            log_query,
            slow_threshold,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.log_query, config.slow_query_threshold())
    }

    pub fn is_slow(&self, elapsed: Duration) -> bool {
        !self.slow_threshold.is_zero() && elapsed > self.slow_threshold
    }

    /// Level of the event emitted for a statement that took `elapsed`.
    pub fn level(&self, elapsed: Duration, failed: bool) -> Level {
        if failed {
            Level::ERROR
        } else if self.is_slow(elapsed) {
            Level::WARN
        } else if self.log_query {
            Level::INFO
        } else {
            Level::DEBUG
        }
    }

    pub fn record(
        &self,
        database: &str,
        node: &str,
        kind: OperationKind,
        elapsed: Duration,
        error: Option<&dyn fmt::Display>,
    ) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let level = self.level(elapsed, error.is_some());
        if let Some(e) = error {
            tracing::error!(
                database = %database,
                node = %node,
                kind = ?kind,
                elapsed_ms,
                error = %e,
                "Query failed"
            );
        } else if level == Level::WARN {
            tracing::warn!(
                database = %database,
                node = %node,
                kind = ?kind,
                elapsed_ms,
                threshold_ms = self.slow_threshold.as_millis() as u64,
                "Slow query"
            );
        } else if level == Level::INFO {
            tracing::info!(database = %database, node = %node, kind = ?kind, elapsed_ms, "Query");
        } else {
            tracing::debug!(database = %database, node = %node, kind = ?kind, elapsed_ms, "Query");
        }
    }
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::new(false, Duration::from_millis(200))
    }
}
