//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use edge_gateway::config::{GatewayConfig, RouteConfig};
use edge_gateway::security::token::unix_now;
use edge_gateway::security::TokenCodec;
use edge_gateway::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a mock backend that answers 200 with the request head it received
/// as the body, so tests can inspect forwarded headers.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(Duration::ZERO).await
}

/// Like [`start_echo_backend`] but waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    start_backend(delay).await
}

async fn start_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = answer(socket, delay).await;
            });
        }
    });

    addr
}

async fn answer(mut socket: TcpStream, delay: Duration) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let body = String::from_utf8_lossy(&head).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub const TOKEN_SECRET: &str =
    "integration-secret-integration-secret-integration-secret-integration-0123456789";

/// Default config with a single catch-all route to `upstream`.
pub fn config_for(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.token_secret = TOKEN_SECRET.to_string();
    config.observability.metrics_enabled = false;
    config.routes = vec![RouteConfig {
        name: "all".into(),
        path_prefix: "/".into(),
        upstream: upstream.to_string(),
        priority: 0,
    }];
    config
}

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub codec: TokenCodec,
    shutdown: Shutdown,
}

impl TestGateway {
    pub async fn start(config: GatewayConfig) -> Self {
        let codec = TokenCodec::from_config(&config.auth);
        let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server = HttpServer::new(config);
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        Self {
            addr,
            codec,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token(&self, subject: &str, role: &str) -> String {
        self.codec.issue(subject, role, unix_now()).unwrap()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
