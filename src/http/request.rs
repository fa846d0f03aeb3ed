//! Request line and request-target parsing.
//!
//! # Responsibilities
//! - Read the request line from the client, bounded in length
//! - Split it into method, URI and version
//! - Decompose an absolute-form `http://host[:port][/path]` URI
//!
//! # Design Decisions
//! - Parsing is purely syntactic: no DNS, no percent-decoding
//! - Any deviation aborts the transaction; nothing is sent back

use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::cache::cache_key;
use crate::http::error::{ProxyError, ProxyResult};

/// Port used when the URI does not name one.
pub const DEFAULT_PORT: u16 = 80;

const SCHEME: &str = "http://";

/// Read one `\n`-terminated line of at most `limit` bytes.
///
/// Returns an empty buffer at end of stream. A line that hits the limit
/// without a terminator is returned as-is; callers decide what that means.
pub async fn read_line<R>(reader: &mut R, limit: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    reader
        .take(limit as u64)
        .read_until(b'\n', &mut line)
        .await?;
    Ok(line)
}

/// Strip a trailing `\r\n` or `\n`.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// `<METHOD> <URI> <VERSION>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    /// Parse a request line; exactly three whitespace-separated fields.
    pub fn parse(line: &str) -> ProxyResult<Self> {
        let mut parts = trim_line_ending(line).split_whitespace();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(uri), Some(version), None) => Ok(Self {
                method: method.to_string(),
                uri: uri.to_string(),
                version: version.to_string(),
            }),
            _ => Err(ProxyError::MalformedRequestLine(
                trim_line_ending(line).to_string(),
            )),
        }
    }

    /// Method names are matched case-insensitively.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Read and parse the request line, rejecting anything but GET.
///
/// Also returns the number of bytes consumed, line ending included.
pub async fn read_request_line<R>(reader: &mut R, limit: usize) -> ProxyResult<(RequestLine, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let raw = read_line(reader, limit)
        .await
        .map_err(ProxyError::ClientRead)?;
    if raw.is_empty() {
        return Err(ProxyError::EmptyRequest);
    }
    if !raw.ends_with(b"\n") && raw.len() >= limit {
        return Err(ProxyError::HeaderTooLarge { limit });
    }

    let line = std::str::from_utf8(&raw)
        .map_err(|_| ProxyError::MalformedRequestLine(String::from_utf8_lossy(&raw).into_owned()))?;
    let request = RequestLine::parse(line)?;
    if !request.is_get() {
        return Err(ProxyError::UnsupportedMethod(request.method));
    }
    Ok((request, raw.len()))
}

/// Decomposed absolute-form request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUri {
    /// Host as written in the URI (IPv6 literals keep their brackets).
    pub host: String,
    pub port: u16,
    /// Always starts with `/`.
    pub path: String,
}

impl TargetUri {
    /// Parse `http://host[:port][/path]`.
    pub fn parse(uri: &str) -> ProxyResult<Self> {
        let rest = match uri.get(..SCHEME.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME) => &uri[SCHEME.len()..],
            _ => return Err(ProxyError::InvalidUri(uri.to_string())),
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };

        let (host, port) = split_authority(authority)
            .ok_or_else(|| ProxyError::InvalidUri(uri.to_string()))?;
        if host.is_empty() {
            return Err(ProxyError::InvalidUri(uri.to_string()));
        }

        let port = match port {
            None | Some("") => DEFAULT_PORT,
            Some(p) => match p.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return Err(ProxyError::InvalidPort(p.to_string())),
            },
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// `host ++ path`. Port is deliberately not part of the key.
    pub fn cache_key(&self) -> String {
        cache_key(&self.host, &self.path)
    }

    /// Host suitable for a socket connect (IPv6 brackets removed).
    pub fn connect_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }
}

impl fmt::Display for TargetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}{}", SCHEME, self.host, self.port, self.path)
    }
}

/// Split `host[:port]` or `[v6]:port`.
fn split_authority(authority: &str) -> Option<(&str, Option<&str>)> {
    if authority.starts_with('[') {
        let end = authority.find(']')?;
        let (host, rest) = authority.split_at(end + 1);
        return match rest {
            "" => Some((host, None)),
            _ => Some((host, Some(rest.strip_prefix(':')?))),
        };
    }

    match authority.split_once(':') {
        Some((host, port)) => Some((host, Some(port))),
        None => Some((authority, None)),
    }
}
