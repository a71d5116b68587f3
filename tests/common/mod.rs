//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use simple_proxy::config::{ProxyConfig, RouteConfig};
use simple_proxy::http::HttpServer;
use simple_proxy::lifecycle::Shutdown;
use simple_proxy::proxy::Dispatcher;
use simple_proxy::routing::RouteTable;

/// A running proxy; shutting down when dropped.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let table = RouteTable::build(&config.routes).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(table, &config).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, dispatcher);
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestProxy { addr, shutdown }
}

/// Config routing each `(host, upstream)` pair.
pub fn config_with_routes(routes: &[(&str, String)]) -> ProxyConfig {
    ProxyConfig {
        routes: routes
            .iter()
            .map(|(host, upstream)| RouteConfig::new(*host, upstream.clone()))
            .collect(),
        ..ProxyConfig::default()
    }
}

/// Client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Upstream that echoes the request it received as JSON.
pub struct EchoUpstream {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl EchoUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct EchoState {
    name: &'static str,
    hits: Arc<AtomicUsize>,
}

/// Start an echo upstream. Responds with the status in `x-echo-status`
/// when the request carries one.
pub async fn start_echo_upstream(name: &'static str) -> EchoUpstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().fallback(echo).with_state(EchoState {
        name,
        hits: hits.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    EchoUpstream { addr, hits }
}

async fn echo(State(state): State<EchoState>, request: Request) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap();

    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &parts.headers {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }

    let status = parts
        .headers
        .get("x-echo-status")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let echoed = json!({
        "upstream": state.name,
        "method": parts.method.as_str(),
        "uri": parts.uri.to_string(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    });

    (status, Json(echoed)).into_response()
}

/// Start an upstream driven by raw socket handling, one task per connection.
pub async fn start_raw_upstream<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move { handler(socket).await });
        }
    });

    addr
}

/// Read until the end of the request head.
pub async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
