//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive checks (passive.rs):
//!     Query failure reported by the after-hook
//!     → count error on the serving node
//!     → probe it and every online reader
//!     → failing nodes go offline
//!     → arm the reconnection loop
//!
//! Active checks (active.rs):
//!     First node of a set goes offline
//!     → one loop per set (compare-and-set guard)
//!     → every interval: probe offline nodes, bring successes back
//!     → exit once the whole set is online
//! ```
//!
//! # Design Decisions
//! - Event-triggered: a healthy set generates no probe traffic
//! - Probes are bounded by a timeout shorter than the loop interval
//! - Writer health is observability only; writes always go to the writer

pub mod active;
pub mod passive;
pub mod probe;

pub use active::HealthMonitor;
