//! Accept loop and per-connection transaction handling.
//!
//! # Responsibilities
//! - Accept connections and spawn one task per connection
//! - Drive a single GET transaction: parse, cache lookup, forward, store
//! - Keep every failure local to its connection
//!
//! # Design Decisions
//! - One request per connection; the socket closes when the task ends
//! - The client's header block is consumed before the cache lookup so a
//!   hit never closes a socket with unread request bytes
//! - The cache is the only state shared between connections

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

use crate::cache::{CacheStore, PutOutcome};
use crate::config::ProxyConfig;
use crate::http::error::{ProxyError, ProxyResult};
use crate::http::headers::{build_origin_request, read_client_headers};
use crate::http::request::{read_request_line, TargetUri};
use crate::http::response::{forward_to_origin, RelayOptions};
use crate::net::{accept_backoff, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;

/// How a completed transaction was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Answered from the cache without contacting the origin.
    CacheHit { bytes: usize },
    /// Relayed from the origin; `cached` if the response was stored.
    Forwarded { bytes: usize, cached: bool },
}

impl Transaction {
    fn outcome(&self) -> &'static str {
        match self {
            Transaction::CacheHit { .. } => "hit",
            Transaction::Forwarded { .. } => "miss",
        }
    }
}

/// Serve exactly one request on `stream`.
pub async fn handle_connection<S>(
    stream: S,
    cache: &CacheStore,
    config: &ProxyConfig,
) -> ProxyResult<Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut client) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let request_limit = config.upstream.max_request_header_bytes;

    let (request, line_len) = read_request_line(&mut reader, request_limit).await?;
    let target = TargetUri::parse(&request.uri)?;
    let client_headers = read_client_headers(&mut reader, request_limit - line_len)
        .await
        .map_err(|e| match e {
            ProxyError::HeaderTooLarge { .. } => ProxyError::HeaderTooLarge { limit: request_limit },
            other => other,
        })?;

    let key = target.cache_key();
    if let Some(payload) = cache.get(&key) {
        tracing::debug!(key = %key, bytes = payload.len(), "Cache hit");
        client
            .write_all(&payload)
            .await
            .map_err(ProxyError::ClientWrite)?;
        let _ = client.shutdown().await;
        return Ok(Transaction::CacheHit {
            bytes: payload.len(),
        });
    }

    tracing::debug!(key = %key, target = %target, "Cache miss, forwarding");
    let origin_request = build_origin_request(&target, &client_headers, &config.upstream.user_agent);
    let options = RelayOptions {
        chunk_size: config.upstream.read_chunk_size,
        max_object_size: cache.max_object_size(),
        max_header_bytes: config.upstream.max_response_header_bytes,
    };
    let summary = forward_to_origin(&target, origin_request.as_bytes(), &mut client, options).await?;
    let _ = client.shutdown().await;

    let bytes = summary.total_len();
    let cached = match summary.payload {
        Some(payload) => match cache.put(key.as_str(), payload) {
            PutOutcome::Stored { evicted } | PutOutcome::Replaced { evicted } => {
                tracing::debug!(key = %key, bytes, evicted, "Response cached");
                true
            }
            PutOutcome::TooLarge => false,
        },
        None => {
            tracing::debug!(key = %key, bytes, "Response not cacheable");
            false
        }
    };

    Ok(Transaction::Forwarded { bytes, cached })
}

/// The caching forward proxy.
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    cache: Arc<CacheStore>,
    connections: ConnectionTracker,
}

impl ProxyServer {
    /// Create a server with a fresh cache sized from `config`.
    pub fn new(config: ProxyConfig) -> Self {
        let cache = Arc::new(CacheStore::from_config(&config.cache));
        Self::with_cache(config, cache)
    }

    /// Create a server around an existing cache.
    pub fn with_cache(config: ProxyConfig, cache: Arc<CacheStore>) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            connections: ConnectionTracker::new(),
        }
    }

    pub fn cache(&self) -> Arc<CacheStore> {
        Arc::clone(&self.cache)
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Accept failures are logged and the loop keeps going after a short,
    /// growing pause. Connections already in flight are left to finish on
    /// their own.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            max_connections = listener.max_connections(),
            max_cache_size = self.cache.max_cache_size(),
            max_object_size = self.cache.max_object_size(),
            "Proxy accepting connections"
        );

        let mut accept_failures = 0u32;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        accept_failures = 0;
                        let cache = Arc::clone(&self.cache);
                        let config = Arc::clone(&self.config);
                        let guard = self.connections.track();

                        tokio::spawn(async move {
                            let _permit = permit;
                            serve(stream, peer, &cache, &config, guard.id()).await;
                        });
                    }
                    Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                    Err(e) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let delay = accept_backoff(accept_failures);
                        tracing::warn!(
                            error = %e,
                            consecutive_failures = accept_failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Accept failed"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.recv() => {
                                tracing::info!("Proxy stopped accepting connections");
                                return Ok(());
                            }
                        }
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!(
                        active_connections = self.connections.active_count(),
                        "Proxy stopped accepting connections"
                    );
                    return Ok(());
                }
            }
        }
    }
}

async fn serve<S>(
    stream: S,
    peer: SocketAddr,
    cache: &CacheStore,
    config: &ProxyConfig,
    connection_id: crate::net::ConnectionId,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match handle_connection(stream, cache, config).await {
        Ok(transaction) => {
            metrics::record_request(transaction.outcome());
            tracing::debug!(
                connection_id = %connection_id,
                peer = %peer,
                ?transaction,
                "Transaction complete"
            );
        }
        Err(e @ ProxyError::OriginConnect { .. }) => {
            metrics::record_request("aborted");
            tracing::warn!(connection_id = %connection_id, peer = %peer, error = %e, "Origin unreachable");
        }
        Err(e) => {
            metrics::record_request("aborted");
            tracing::debug!(
                connection_id = %connection_id,
                peer = %peer,
                error = %e,
                request_error = e.is_request_error(),
                "Transaction aborted"
            );
        }
    }
}
