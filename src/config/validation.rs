//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes > 0, object limit within cache limit)
//! - Check that addresses parse before anything binds to them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cache.max_object_size must be greater than zero")]
    ZeroObjectSize,

    #[error("cache.max_object_size ({object}) exceeds cache.max_cache_size ({cache})")]
    ObjectLargerThanCache { object: usize, cache: usize },

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("listener.bind_address {0:?} is not an IP address")]
    InvalidBindAddress(String),

    #[error("upstream.read_chunk_size must be greater than zero")]
    ZeroReadChunk,

    #[error("upstream.max_request_header_bytes must be greater than zero")]
    ZeroHeaderLimit,

    #[error("upstream.max_response_header_bytes must be greater than zero")]
    ZeroResponseHeaderLimit,

    #[error("upstream.user_agent must be a non-empty single line")]
    InvalidUserAgent,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let cache = &config.cache;
    if cache.max_object_size == 0 {
        errors.push(ValidationError::ZeroObjectSize);
    }
    if cache.max_object_size > cache.max_cache_size {
        errors.push(ValidationError::ObjectLargerThanCache {
            object: cache.max_object_size,
            cache: cache.max_cache_size,
        });
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.listener.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let upstream = &config.upstream;
    if upstream.read_chunk_size == 0 {
        errors.push(ValidationError::ZeroReadChunk);
    }
    if upstream.max_request_header_bytes == 0 {
        errors.push(ValidationError::ZeroHeaderLimit);
    }
    if upstream.max_response_header_bytes == 0 {
        errors.push(ValidationError::ZeroResponseHeaderLimit);
    }
    if upstream.user_agent.trim().is_empty()
        || upstream.user_agent.contains(['\r', '\n'])
    {
        errors.push(ValidationError::InvalidUserAgent);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
