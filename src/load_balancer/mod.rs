//! Read load balancing.
//!
//! # Data Flow
//! ```text
//! Read operation reaches the before-hook
//!     → LoadBalancer::next_reader(readers)
//!         - random.rs (uniform among online readers)
//!     → Some(reader): bind operation to it
//!     → None: stay on the writer
//! ```
//!
//! # Design Decisions
//! - Selection is a function of current health only; no rotation state
//! - The balancer never touches counters; the dispatcher does
//! - Racing callers may pick the same reader, which is fine for spreading load

pub mod random;

use std::sync::Arc;
use crate::replication::Node;

pub use random::RandomHealthy;

/// Strategy choosing the reader for the next read.
pub trait LoadBalancer<C>: Send + Sync {
    fn next_reader(&self, readers: &[Arc<Node<C>>]) -> Option<Arc<Node<C>>>;
}
