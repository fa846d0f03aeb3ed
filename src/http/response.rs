//! Origin response relay.
//!
//! # Responsibilities
//! - Open the origin connection and send the rewritten request
//! - Read the status line and headers, noting `Content-Length`
//! - Forward the header block to the client as soon as it is complete
//! - Stream the body to the client while buffering a cache candidate
//!
//! # Design Decisions
//! - Two body modes: exactly `Content-Length` bytes, or until the origin
//!   closes. The second relies on the origin closing after the response,
//!   which `Connection: close` on an HTTP/1.0 request asks for.
//! - An origin that closes early is not an error; whatever arrived is
//!   forwarded and sized.
//! - The cache candidate stops growing once it passes `max_object_size`,
//!   so an oversized response never costs more than one object of memory.
//! - The header block is buffered before it is forwarded, so it is capped at
//!   `max_header_bytes`; an origin that exceeds it aborts the transaction
//!   before anything reaches the client.

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::http::error::{ProxyError, ProxyResult};
use crate::http::request::{read_line, trim_line_ending, TargetUri};

/// Longest single read while scanning response header lines.
const HEADER_LINE_LIMIT: usize = 16 * 1024;

/// How the end of the response body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// `Content-Length` was present and valid.
    Length(usize),
    /// Read until the origin closes the connection.
    UntilClose,
}

/// Tunables for relaying one response.
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Read size for body chunks.
    pub chunk_size: usize,
    /// Largest header + body size that is kept as a cache candidate.
    pub max_object_size: usize,
    /// Largest response header block buffered before forwarding.
    pub max_header_bytes: usize,
}

/// What was relayed to the client.
#[derive(Debug, Clone)]
pub struct RelaySummary {
    pub header_len: usize,
    pub body_len: usize,
    pub body_mode: BodyMode,
    /// False when the origin closed before the blank line ending the headers.
    pub headers_complete: bool,
    /// Full header + body bytes, present only when they fit `max_object_size`.
    pub payload: Option<Bytes>,
}

impl RelaySummary {
    pub fn total_len(&self) -> usize {
        self.header_len + self.body_len
    }
}

/// Header block read from the origin.
#[derive(Debug, Default)]
struct ResponseHead {
    bytes: Vec<u8>,
    content_length: Option<usize>,
    complete: bool,
}

/// Parse a `Content-Length: N` header line.
pub fn parse_content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

async fn read_head<O>(origin: &mut O, limit: usize) -> ProxyResult<ResponseHead>
where
    O: AsyncBufRead + Unpin,
{
    let mut head = ResponseHead::default();
    let mut mid_line = false;
    let mut status_seen = false;

    loop {
        let remaining = limit.saturating_sub(head.bytes.len());
        if remaining == 0 {
            return Err(ProxyError::ResponseHeaderTooLarge { limit });
        }

        let fragment = match read_line(origin, HEADER_LINE_LIMIT.min(remaining)).await {
            Ok(fragment) => fragment,
            Err(e) if head.bytes.is_empty() => {
                tracing::debug!(error = %e, "origin read failed before response");
                return Err(ProxyError::OriginClosed);
            }
            Err(e) => {
                tracing::debug!(error = %e, "origin read failed inside headers");
                break;
            }
        };
        if fragment.is_empty() {
            break;
        }
        head.bytes.extend_from_slice(&fragment);

        let starts_line = !mid_line;
        mid_line = !fragment.ends_with(b"\n");
        if !starts_line {
            continue;
        }
        if !status_seen {
            status_seen = true;
            continue;
        }

        let line = String::from_utf8_lossy(&fragment);
        let line = trim_line_ending(&line);
        if line.is_empty() && !mid_line {
            head.complete = true;
            break;
        }
        if head.content_length.is_none() {
            head.content_length = parse_content_length(line);
        }
    }

    if head.bytes.is_empty() {
        return Err(ProxyError::OriginClosed);
    }
    Ok(head)
}

/// Relay one response from `origin` to `client`.
pub async fn relay_response<O, C>(
    origin: &mut O,
    client: &mut C,
    options: RelayOptions,
) -> ProxyResult<RelaySummary>
where
    O: AsyncBufRead + Unpin,
    C: AsyncWrite + Unpin,
{
    let head = read_head(origin, options.max_header_bytes).await?;
    let header_len = head.bytes.len();

    client
        .write_all(&head.bytes)
        .await
        .map_err(ProxyError::ClientWrite)?;

    let body_mode = match head.content_length {
        Some(len) if head.complete => BodyMode::Length(len),
        _ => BodyMode::UntilClose,
    };

    if !head.complete {
        client.flush().await.map_err(ProxyError::ClientWrite)?;
        return Ok(RelaySummary {
            header_len,
            body_len: 0,
            body_mode,
            headers_complete: false,
            payload: None,
        });
    }

    let limit = options.max_object_size;
    let mut candidate = (header_len <= limit).then(|| {
        let expected = match body_mode {
            BodyMode::Length(len) => header_len.saturating_add(len).min(limit),
            BodyMode::UntilClose => header_len,
        };
        let mut buffer = Vec::with_capacity(expected);
        buffer.extend_from_slice(&head.bytes);
        buffer
    });

    let mut chunk = vec![0u8; options.chunk_size.max(1)];
    let mut body_len = 0usize;

    loop {
        let want = match body_mode {
            BodyMode::Length(len) => {
                let remaining = len - body_len;
                if remaining == 0 {
                    break;
                }
                remaining.min(chunk.len())
            }
            BodyMode::UntilClose => chunk.len(),
        };

        let n = match origin.read(&mut chunk[..want]).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, body_len, "origin read failed, ending body");
                break;
            }
        };

        client
            .write_all(&chunk[..n])
            .await
            .map_err(ProxyError::ClientWrite)?;
        body_len += n;

        let keep = candidate
            .as_ref()
            .is_some_and(|buffer| buffer.len() + n <= limit);
        if keep {
            if let Some(buffer) = candidate.as_mut() {
                buffer.extend_from_slice(&chunk[..n]);
            }
        } else {
            candidate = None;
        }
    }

    client.flush().await.map_err(ProxyError::ClientWrite)?;

    if let BodyMode::Length(len) = body_mode {
        if body_len < len {
            tracing::debug!(expected = len, received = body_len, "origin closed before Content-Length");
        }
    }

    Ok(RelaySummary {
        header_len,
        body_len,
        body_mode,
        headers_complete: true,
        payload: candidate.map(Bytes::from),
    })
}

/// Connect to the origin, send `request`, and relay the response to `client`.
pub async fn forward_to_origin<C>(
    target: &TargetUri,
    request: &[u8],
    client: &mut C,
    options: RelayOptions,
) -> ProxyResult<RelaySummary>
where
    C: AsyncWrite + Unpin,
{
    let stream = TcpStream::connect((target.connect_host(), target.port))
        .await
        .map_err(|source| ProxyError::OriginConnect {
            addr: format!("{}:{}", target.host, target.port),
            source,
        })?;

    let (read_half, mut write_half) = stream.into_split();
    write_half
        .write_all(request)
        .await
        .map_err(ProxyError::OriginWrite)?;

    let mut origin = BufReader::new(read_half);
    relay_response(&mut origin, client, options).await
}
