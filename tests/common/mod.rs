//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use caching_proxy::config::ProxyConfig;
use caching_proxy::net::Listener;
use caching_proxy::{CacheStore, ProxyServer, Shutdown};

/// A mock origin server that records every request it receives.
pub struct MockOrigin {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockOrigin {
    /// Number of connections that delivered a request.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Absolute URI for `path` on this origin.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start an origin that answers every request with `response`, then closes.
pub async fn start_origin(response: Vec<u8>) -> MockOrigin {
    start_programmable_origin(move |_| response.clone()).await
}

/// Start an origin whose response is computed from the request head.
pub async fn start_programmable_origin<F>(respond: F) -> MockOrigin
where
    F: Fn(&str) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let (task_hits, task_requests) = (Arc::clone(&hits), Arc::clone(&requests));
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let hits = Arc::clone(&task_hits);
            let requests = Arc::clone(&task_requests);
            let respond = Arc::clone(&respond);

            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                hits.fetch_add(1, Ordering::SeqCst);
                let response = respond(&head);
                requests.lock().unwrap().push(head);
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockOrigin {
        addr,
        hits,
        requests,
    }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// A running proxy instance.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub cache: Arc<CacheStore>,
    pub shutdown: Shutdown,
}

/// Start a proxy on an ephemeral port.
pub async fn start_proxy(mut config: ProxyConfig) -> TestProxy {
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ProxyServer::new(config);
    let cache = server.cache();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        cache,
        shutdown,
    }
}

/// `GET <uri> HTTP/1.0` with a few ordinary headers.
pub fn get_request(uri: &str) -> String {
    format!(
        "GET {uri} HTTP/1.0\r\nHost: ignored.example\r\nAccept: */*\r\nUser-Agent: test-client\r\n\r\n"
    )
}

/// Send a raw request to the proxy and read until it closes the connection.
pub async fn send_raw(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("proxy did not close the connection")
        .unwrap_or_default();
    response
}

/// An HTTP/1.0 response with a `Content-Length` header.
pub fn response_with_length(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// An HTTP/1.0 response delimited only by the connection closing.
pub fn response_until_close(body: &[u8]) -> Vec<u8> {
    let mut response = b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\n".to_vec();
    response.extend_from_slice(body);
    response
}
