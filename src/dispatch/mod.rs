//! Query dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Caller → Gateway::operation(kind)        (bound to writer)
//!     → before-hook: dispatcher.rs
//!         - transaction: leave as is
//!         - write: writer
//!         - read: load balancer, writer fallback
//!         - count query on the chosen node
//!     → execution engine runs the query on op.connection()
//!     → after-hook: dispatcher.rs
//!         - error: health monitor takes over
//! ```
//!
//! # Design Decisions
//! - The router decides where, never what; operations are opaque
//! - Offline-ness never reaches the caller as an error

pub mod dispatcher;
pub mod gateway;
pub mod operation;

pub use dispatcher::Dispatcher;
pub use gateway::{Gateway, Transaction};
pub use operation::{Operation, OperationKind};
