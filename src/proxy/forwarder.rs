//! Upstream forwarding over a per-route connection pool.
//!
//! # Responsibilities
//! - Own one keep-alive client (connection pool) per route
//! - Execute a single round trip under the end-to-end deadline
//! - Stream the response body back without buffering
//! - Classify transport failures into `ForwardError`
//!
//! # Design Decisions
//! - Built once at startup, shared by every request to the route
//! - The pool synchronizes internally; callers need no locking
//! - No retries: one inbound request, at most one upstream attempt

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::{PoolConfig, TimeoutConfig};
use crate::observability::{metrics, tracing::upstream_span};
use crate::proxy::body::{DeadlineBody, InFlight};
use crate::proxy::error::ForwardError;

pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the TLS-capable connector shared by all route pools.
pub fn build_connector(
    timeouts: &TimeoutConfig,
) -> Result<HttpsConnector<HttpConnector>, rustls::Error> {
    let mut http = HttpConnector::new();
    http.set_nodelay(true);
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    // https:// upstreams are handled by the TLS wrapper.
    http.enforce_http(false);

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(provider)?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(connector)
}

/// Forwards rewritten requests for one route.
#[derive(Clone, Debug)]
pub struct UpstreamForwarder {
    route: String,
    client: UpstreamClient,
    deadline: Duration,
}

impl UpstreamForwarder {
    /// Create the route's connection pool on top of a shared connector.
    pub fn new(
        route: impl Into<String>,
        connector: HttpsConnector<HttpConnector>,
        timeouts: &TimeoutConfig,
        pool: &PoolConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .build(connector);

        Self {
            route: route.into(),
            client,
            deadline: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Perform one upstream round trip.
    ///
    /// The returned body is still streaming from the upstream; dropping it
    /// aborts the exchange.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let started = Instant::now();
        let deadline = started + self.deadline;
        let span = upstream_span(&self.route, request.method(), request.uri());
        let mut in_flight = InFlight::new(self.route.clone());

        let outcome = tokio::time::timeout_at(deadline, self.client.request(request))
            .instrument(span)
            .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                in_flight.complete();
                let err = ForwardError::classify(&err);
                metrics::record_upstream_error(&self.route, err.kind());
                return Err(err);
            }
            Err(_) => {
                in_flight.complete();
                let err = ForwardError::deadline(self.deadline);
                metrics::record_upstream_error(&self.route, err.kind());
                return Err(err);
            }
        };

        metrics::record_upstream_latency(&self.route, started);
        tracing::debug!(
            route = %self.route,
            status = response.status().as_u16(),
            "Upstream responded"
        );

        let (parts, body) = response.into_parts();
        let body = DeadlineBody::new(body, deadline, self.deadline, in_flight);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
