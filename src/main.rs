//! Simple Proxy
//!
//! A host-based HTTP reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ Dispatcher ──▶ RouteTable (Host → upstream)
//!                     (request id,        │
//!                      access log,        ▼
//!                      CORS, /healthz)  rewrite ──▶ UpstreamForwarder ──▶ Upstream
//!                                                   (pool per route,
//!     Client Response                                deadline, TLS)
//!     ◀────────────── streamed body ◀───────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use simple_proxy::config::load_config;
use simple_proxy::http::HttpServer;
use simple_proxy::lifecycle::{wait_for_shutdown_signal, Shutdown};
use simple_proxy::observability::{logging, metrics};
use simple_proxy::proxy::Dispatcher;
use simple_proxy::routing::RouteTable;

#[derive(Parser, Debug)]
#[command(name = "simple-proxy", version, about = "Host-based HTTP reverse proxy")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "SIMPLE_PROXY_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "simple-proxy starting"
    );
    for route in &config.routes {
        tracing::info!(host = %route.host, upstream = %route.upstream, "Route");
    }

    let table = match RouteTable::build(&config.routes) {
        Ok(table) => table,
        Err(err) => {
            tracing::error!(error = %err, "Invalid route table");
            return Err(err.into());
        }
    };
    let dispatcher = Arc::new(Dispatcher::new(table, &config)?);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_shutdown.trigger();
    });

    HttpServer::new(&config, dispatcher)
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
