//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Connect registry → Start admin API
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or registry close → broadcast → reconnection loops and
//!     status logger exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then registry, then surfaces
//! - A writer that cannot be reached at startup is fatal
//! - Background loops never outlive their registry

pub mod shutdown;

pub use shutdown::Shutdown;
