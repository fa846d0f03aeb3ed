//! Per-transaction error taxonomy.
//!
//! Every variant aborts the current transaction: the connection is closed
//! and nothing is written to the client. None of them is fatal to the
//! process.

use std::io;
use thiserror::Error;

/// Why a single request/response transaction was abandoned.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read from client: {0}")]
    ClientRead(#[source] io::Error),

    #[error("client closed the connection before sending a request")]
    EmptyRequest,

    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid request URI: {0:?}")]
    InvalidUri(String),

    #[error("invalid port in request URI: {0:?}")]
    InvalidPort(String),

    #[error("request header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    #[error("request header is not valid UTF-8")]
    MalformedHeader,

    #[error("failed to connect to origin {addr}: {source}")]
    OriginConnect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to send request to origin: {0}")]
    OriginWrite(#[source] io::Error),

    #[error("origin closed the connection without a response")]
    OriginClosed,

    #[error("origin response header block exceeds {limit} bytes")]
    ResponseHeaderTooLarge { limit: usize },

    #[error("failed to write to client: {0}")]
    ClientWrite(#[source] io::Error),
}

impl ProxyError {
    /// True for errors caused by the request itself rather than I/O.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ProxyError::EmptyRequest
                | ProxyError::MalformedRequestLine(_)
                | ProxyError::UnsupportedMethod(_)
                | ProxyError::InvalidUri(_)
                | ProxyError::InvalidPort(_)
                | ProxyError::HeaderTooLarge { .. }
                | ProxyError::MalformedHeader
        )
    }
}

/// Result alias for transaction steps.
pub type ProxyResult<T> = Result<T, ProxyError>;
