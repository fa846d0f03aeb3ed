//! Client header consumption and origin request construction.
//!
//! # Responsibilities
//! - Read the client's header block up to the blank-line terminator
//! - Drop the headers the proxy replaces (Host, Connection,
//!   Proxy-Connection, User-Agent)
//! - Emit an HTTP/1.0 request that always closes the origin connection
//!
//! # Design Decisions
//! - Passthrough headers are forwarded byte-for-byte in their original order
//! - Header names are compared case-insensitively
//! - The origin Host header comes from the parsed URI, never from the client

use tokio::io::AsyncBufRead;

use crate::http::error::{ProxyError, ProxyResult};
use crate::http::request::{read_line, trim_line_ending, TargetUri};

/// Headers the proxy always replaces with its own values.
pub const REPLACED_HEADERS: [&str; 4] = ["Host", "Connection", "Proxy-Connection", "User-Agent"];

/// Read header lines until the blank line (or end of stream).
///
/// Returned lines have their line endings stripped. The blank terminator
/// is consumed but not returned.
pub async fn read_client_headers<R>(reader: &mut R, limit: usize) -> ProxyResult<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Vec::new();
    let mut consumed = 0usize;

    loop {
        let remaining = limit.saturating_sub(consumed);
        if remaining == 0 {
            return Err(ProxyError::HeaderTooLarge { limit });
        }

        let raw = read_line(reader, remaining)
            .await
            .map_err(ProxyError::ClientRead)?;
        if raw.is_empty() {
            break;
        }
        consumed += raw.len();
        if !raw.ends_with(b"\n") && consumed >= limit {
            return Err(ProxyError::HeaderTooLarge { limit });
        }

        let line = String::from_utf8(raw).map_err(|_| ProxyError::MalformedHeader)?;
        let line = trim_line_ending(&line);
        if line.is_empty() {
            break;
        }
        headers.push(line.to_string());
    }

    Ok(headers)
}

/// Header name of a `Name: value` line, if it has one.
fn header_name(line: &str) -> Option<&str> {
    line.split_once(':').map(|(name, _)| name.trim())
}

/// Whether the proxy drops this client header line.
pub fn is_replaced(line: &str) -> bool {
    header_name(line).is_some_and(|name| {
        REPLACED_HEADERS
            .iter()
            .any(|replaced| replaced.eq_ignore_ascii_case(name))
    })
}

/// Build the request sent to the origin server.
pub fn build_origin_request(target: &TargetUri, client_headers: &[String], user_agent: &str) -> String {
    let mut request = String::with_capacity(256);

    request.push_str("GET ");
    request.push_str(&target.path);
    request.push_str(" HTTP/1.0\r\n");

    request.push_str("Host: ");
    request.push_str(&target.host);
    request.push_str("\r\n");

    for line in client_headers.iter().filter(|line| !is_replaced(line)) {
        request.push_str(line);
        request.push_str("\r\n");
    }

    request.push_str("Connection: close\r\n");
    request.push_str("Proxy-Connection: close\r\n");
    request.push_str("User-Agent: ");
    request.push_str(user_agent);
    request.push_str("\r\n\r\n");

    request
}
