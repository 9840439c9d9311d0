//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use query_frontend::config::{FrontendConfig, SearchConfig, ServerConfig, StorageConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a programmable mock storage node on an ephemeral port.
///
/// `f` receives the request line (e.g. `GET /select/0/... HTTP/1.1`) and
/// returns the status and body to reply with.
pub async fn start_storage_node<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(request_line) = read_request_head(&mut socket).await else {
                    return;
                };
                let (status, body) = f(request_line).await;
                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    404 => "Not Found",
                    422 => "Unprocessable Entity",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Mock storage node answering every request with `body` after `delay_ms`.
pub async fn start_slow_storage_node(delay_ms: u64, body: &'static str) -> SocketAddr {
    start_storage_node(move |_| async move {
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        (200, body.to_string())
    })
    .await
}

/// Read up to the end of the request headers; returns the request line.
async fn read_request_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines().next().map(str::to_string)
}

/// Front end config on an ephemeral port, pointed at `storage`.
pub fn frontend_config(storage: SocketAddr, capacity: usize, queue_ms: u64) -> FrontendConfig {
    FrontendConfig {
        server: ServerConfig {
            listen_address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        },
        search: SearchConfig {
            max_concurrent_requests: Some(capacity),
            max_queue_duration_ms: queue_ms,
            ..SearchConfig::default()
        },
        storage: StorageConfig {
            nodes: vec![storage.to_string()],
            ..StorageConfig::default()
        },
        ..FrontendConfig::default()
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
