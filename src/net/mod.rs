//! Connection layer subsystem.
//!
//! # Data Flow
//! ```text
//! NodeConfig
//!     → Connector::open (lazy handle)
//!     → Node owns Arc<Connection>
//!     → Connection::ping used by the health subsystem
//! ```
//!
//! # Design Decisions
//! - The router never executes queries itself; it only pings
//! - Drivers plug in by implementing the two traits in connection.rs
//! - tcp.rs is a driver-free implementation for the binary

pub mod connection;
pub mod tcp;

pub use connection::{opener, Connection, Connector, Opener};
