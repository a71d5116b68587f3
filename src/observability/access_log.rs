//! Per-request access log.
//!
//! # Responsibilities
//! - Emit one structured record per completed request
//! - Pick severity from the response status
//! - Surface errors handlers attached to the response
//!
//! # Fields
//! `client_ip`, `method`, `path`, `status`, `latency_ms`, `user_agent`,
//! `request_id`, and when present `query` and `errors`.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::Level;

use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;

/// Errors accumulated while handling a request, carried as a response
/// extension for the access log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestErrors(Vec<String>);

impl RequestErrors {
    pub fn single(error: impl Into<String>) -> Self {
        Self(vec![error.into()])
    }

    pub fn push(&mut self, error: impl Into<String>) {
        self.0.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RequestErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "Error #{:02}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

/// Access log severity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    ServerError,
    ClientError,
    Redirect,
    Completed,
}

impl Severity {
    pub fn for_status(status: StatusCode) -> Self {
        match status.as_u16() {
            500..=u16::MAX => Severity::ServerError,
            400..=499 => Severity::ClientError,
            300..=399 => Severity::Redirect,
            _ => Severity::Completed,
        }
    }

    pub fn level(self) -> Level {
        match self {
            Severity::ServerError => Level::ERROR,
            Severity::ClientError => Level::WARN,
            Severity::Redirect | Severity::Completed => Level::INFO,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Severity::ServerError => "Server error",
            Severity::ClientError => "Client error",
            Severity::Redirect => "Redirect",
            Severity::Completed => "Request completed",
        }
    }
}

/// Middleware emitting the access record after the response is produced.
pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let user_agent = header_string(&request, header::USER_AGENT.as_str());
    let request_id = header_string(&request, X_REQUEST_ID);
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let errors = response
        .extensions()
        .get::<RequestErrors>()
        .filter(|errors| !errors.is_empty())
        .map(ToString::to_string);

    metrics::record_request(method.as_str(), status.as_u16(), start);

    let severity = Severity::for_status(status);

    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                client_ip = %client_ip,
                method = %method,
                path = %path,
                status = status.as_u16(),
                latency_ms,
                user_agent = %user_agent,
                request_id = %request_id,
                query = query.as_deref(),
                errors = errors.as_deref(),
                "{}",
                severity.message()
            )
        };
    }

    match severity.level() {
        Level::ERROR => emit!(Level::ERROR),
        Level::WARN => emit!(Level::WARN),
        _ => emit!(Level::INFO),
    }

    response
}

fn header_string(request: &Request, name: &str) -> String {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
