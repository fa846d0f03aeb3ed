//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Aggregate cache capacity in bytes.
pub const MAX_CACHE_SIZE: usize = 1_049_000;

/// Largest single response the cache will hold, in bytes.
pub const MAX_OBJECT_SIZE: usize = 102_400;

/// User-Agent sent to every origin in place of the client's own.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, port, concurrency ceiling).
    pub listener: ListenerConfig,

    /// Response cache limits.
    pub cache: CacheConfig,

    /// How requests are sent to and read back from origin servers.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// TCP port. The command line always overrides this.
    pub port: u16,

    /// Maximum concurrently served connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// `bind_address:port` as a string suitable for parsing.
    pub fn socket_address(&self) -> String {
        if self.bind_address.contains(':') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 1024,
        }
    }
}

/// Cache size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on the sum of all cached payload sizes.
    pub max_cache_size: usize,

    /// Upper bound on a single cached payload (headers + body).
    pub max_object_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: MAX_CACHE_SIZE,
            max_object_size: MAX_OBJECT_SIZE,
        }
    }
}

/// Origin-facing settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Fixed User-Agent header value sent to origins.
    pub user_agent: String,

    /// Chunk size for reading response bodies from origins.
    pub read_chunk_size: usize,

    /// Largest client request (request line plus headers) accepted before
    /// the request is dropped.
    pub max_request_header_bytes: usize,

    /// Largest origin response header block relayed before the transaction
    /// is aborted.
    pub max_response_header_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            read_chunk_size: 8192,
            max_request_header_bytes: 64 * 1024,
            max_response_header_bytes: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
