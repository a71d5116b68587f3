//! Per-request orchestration.
//!
//! # Data Flow
//! ```text
//! Request
//!     → host key (Host header)
//!     → RouteTable::lookup
//!         miss → ForwardResult::NotFound
//!         hit  → rewrite → UpstreamForwarder::forward
//!                  ok  → ForwardResult::Forwarded (streaming body)
//!                  err → ForwardResult::UpstreamFailure
//! ```

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::config::{ConfigError, ProxyConfig, RewriteConfig};
use crate::observability::metrics;
use crate::proxy::error::ForwardError;
use crate::proxy::forwarder::{build_connector, UpstreamForwarder};
use crate::proxy::rewrite::{rewrite, RewriteError};
use crate::routing::{host_key, RouteTable};

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum ForwardResult {
    /// Upstream answered; status, headers and streaming body are relayed.
    Forwarded(Response<Body>),
    /// No route for the presented host. Nothing was forwarded.
    NotFound { host: Option<String> },
    /// The single upstream attempt failed.
    UpstreamFailure(ForwardError),
    /// The request could not be addressed to the upstream.
    Rejected(RewriteError),
}

/// Routes requests to upstreams by `Host`.
///
/// Holds the immutable route table and one forwarder per route; shared
/// across all request tasks behind an `Arc`.
#[derive(Debug)]
pub struct Dispatcher {
    table: RouteTable,
    /// One per route, at the route's index.
    forwarders: Vec<UpstreamForwarder>,
    rewrite: RewriteConfig,
}

impl Dispatcher {
    /// Create a forwarder and connection pool for every route.
    pub fn new(table: RouteTable, config: &ProxyConfig) -> Result<Self, ConfigError> {
        let connector = build_connector(&config.timeouts)?;
        let forwarders = table
            .iter()
            .map(|route| {
                UpstreamForwarder::new(
                    route.host_key(),
                    connector.clone(),
                    &config.timeouts,
                    &config.pool,
                )
            })
            .collect();

        Ok(Self {
            table,
            forwarders,
            rewrite: config.proxy.clone(),
        })
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Dispatch one request. At most one upstream attempt is made.
    pub async fn dispatch(&self, request: Request<Body>, peer: Option<SocketAddr>) -> ForwardResult {
        let (parts, body) = request.into_parts();

        let Some(host) = host_key(&parts) else {
            tracing::warn!(path = %parts.uri.path(), "Request without Host header");
            metrics::record_route_miss();
            return ForwardResult::NotFound { host: None };
        };

        let route = match self.table.lookup(host) {
            Some(route) => route,
            None => {
                tracing::warn!(host = %host, path = %parts.uri.path(), "Proxy not found");
                metrics::record_route_miss();
                return ForwardResult::NotFound {
                    host: Some(host.to_string()),
                };
            }
        };

        // `forwarders` was built from `table.iter()`, which yields routes by index.
        let forwarder = &self.forwarders[route.index()];

        let outgoing = match rewrite(&parts, body, route, &self.rewrite, peer) {
            Ok(outgoing) => outgoing,
            Err(err) => {
                tracing::warn!(host = %host, error = %err, "Cannot rewrite request");
                return ForwardResult::Rejected(err);
            }
        };

        tracing::debug!(
            new_url = %outgoing.uri(),
            host = %host,
            upstream = %route.origin(),
            "Proxy request"
        );

        match forwarder.forward(outgoing).await {
            Ok(response) => ForwardResult::Forwarded(response),
            Err(err) => {
                // The access record for this request is the error-level line.
                tracing::warn!(
                    host = %host,
                    upstream = %route.origin(),
                    kind = err.kind(),
                    error = %err,
                    "Upstream request failed"
                );
                ForwardResult::UpstreamFailure(err)
            }
        }
    }
}
