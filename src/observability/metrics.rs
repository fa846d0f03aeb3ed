//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests by outcome, cache usage, connections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): transactions by outcome (hit, miss, aborted)
//! - `proxy_cache_evictions_total` (counter): entries evicted from the LRU tail
//! - `proxy_cache_rejected_total` (counter): responses too large to cache
//! - `proxy_cache_entries` (gauge): entries currently cached
//! - `proxy_cache_bytes` (gauge): bytes currently cached
//! - `proxy_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Outcome labels are static strings to keep cardinality fixed

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count a finished transaction.
pub fn record_request(outcome: &'static str) {
    counter!("proxy_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_evictions(count: usize) {
    counter!("proxy_cache_evictions_total").increment(count as u64);
}

pub fn record_cache_rejected() {
    counter!("proxy_cache_rejected_total").increment(1);
}

pub fn record_cache_usage(entries: usize, bytes: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
    gauge!("proxy_cache_bytes").set(bytes as f64);
}

pub fn record_connection_opened() {
    gauge!("proxy_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("proxy_active_connections").decrement(1.0);
}
