//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and health monitor produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!     → query_log.rs (per-statement events, tiered by outcome and latency)
//!     → node atomics (read by statistics.rs and status.rs)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin API and periodic status log
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Metrics are cheap (atomic increments)
//! - Snapshots never lock the query path

pub mod logging;
pub mod metrics;
pub mod query_log;
pub mod statistics;
pub mod status;

pub use query_log::QueryLog;
pub use statistics::{NodeEntry, NodeSetStatistics, Statistics};
pub use status::{spawn_status_logger, Status};
