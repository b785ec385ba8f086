//! Replication data model.
//!
//! # Structure
//! ```text
//! DatabaseRegistry
//! ├── "admin"     → NodeSet
//! │                 ├── writer: Node
//! │                 └── readers: [Node, Node, ...]
//! └── "customers" → NodeSet
//!                   ├── writer: Node
//!                   └── readers: []
//! ```
//!
//! # Design Decisions
//! - Exactly one writer per set; construction fails without it
//! - Nodes live as long as the registry; a reader whose handle cannot be
//!   opened at startup joins later, in its registration slot
//! - Per-node atomics instead of a lock per set

pub mod node;
pub mod node_set;
pub mod registry;

pub use node::{Node, NodeRole, NodeStatistics};
pub use node_set::{DeferredReader, NodeSet};
pub use registry::DatabaseRegistry;
