//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → command-line overrides (port, connection ceiling)
//!     → shared via Arc with the connection workers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; cache limits are fixed for the process lifetime
//! - All fields have defaults, so running without a file is the common case
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, UpstreamConfig,
    DEFAULT_USER_AGENT, MAX_CACHE_SIZE, MAX_OBJECT_SIZE,
};
pub use validation::{validate_config, ValidationError};
