//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection ceiling)
//!     → connection.rs (connection id, active count)
//!     → Hand off to the HTTP layer, one task per connection
//! ```
//!
//! # Design Decisions
//! - Bounded concurrency: a full server delays accepts rather than refusing them
//! - Each connection tracked for shutdown reporting

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{accept_backoff, ConnectionPermit, Listener, ListenerError};
