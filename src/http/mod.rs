//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → request.rs (request line, absolute URI → host/port/path)
//!     → headers.rs (consume client headers)
//!     → cache lookup by host ++ path
//!         hit:  cached bytes → client
//!         miss: headers.rs (rewrite) → response.rs (origin relay) → cache put
//! ```

pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ProxyError, ProxyResult};
pub use request::{RequestLine, TargetUri};
pub use response::{BodyMode, RelayOptions, RelaySummary};
pub use server::{handle_connection, ProxyServer, Transaction};
