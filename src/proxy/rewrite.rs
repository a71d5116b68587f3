//! Request rewriting for the matched upstream.
//!
//! # Responsibilities
//! - Point the request at the route's upstream origin
//! - Prefix the incoming path with the origin's base path
//! - Strip hop-by-hop and client-supplied forwarding headers
//! - Apply the configured outgoing `Host` policy
//!
//! # Design Decisions
//! - Pure: reads the incoming head, returns a brand-new request
//! - Path joining is literal string concatenation, `base_path + path`;
//!   duplicate separators are preserved byte-for-byte
//! - The outgoing request always speaks HTTP/1.1 to the upstream pool

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    Request, Uri,
};

use crate::config::{HostHeaderPolicy, RewriteConfig};
use crate::routing::{host_key, Route};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const FORWARDED_HEADERS: [HeaderName; 4] = [
    X_FORWARDED_FOR,
    X_FORWARDED_HOST,
    X_FORWARDED_PROTO,
    header::FORWARDED,
];

const HOP_BY_HOP_HEADERS: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// The rewritten path and query could not form a valid URI.
#[derive(Debug, thiserror::Error)]
#[error("cannot address upstream with {target:?}: {source}")]
pub struct RewriteError {
    target: String,
    #[source]
    source: axum::http::Error,
}

/// Build the outgoing request for `route` from an incoming request head.
///
/// `peer` is the client's socket address; it is only used when fresh
/// forwarding headers are enabled.
pub fn rewrite(
    parts: &Parts,
    body: Body,
    route: &Route,
    config: &RewriteConfig,
    peer: Option<SocketAddr>,
) -> Result<Request<Body>, RewriteError> {
    let origin = route.origin();

    let mut target = String::with_capacity(
        origin.base_path().len() + parts.uri.path().len() + parts.uri.query().map_or(0, |q| q.len() + 1),
    );
    target.push_str(origin.base_path());
    target.push_str(parts.uri.path());
    if let Some(query) = parts.uri.query() {
        target.push('?');
        target.push_str(query);
    }

    let uri = Uri::builder()
        .scheme(origin.scheme().clone())
        .authority(origin.authority().clone())
        .path_and_query(target.as_str())
        .build()
        .map_err(|source| RewriteError { target, source })?;

    let presented_host = host_key(parts);
    let mut headers = outgoing_headers(&parts.headers);
    // `TE: trailers` is end-to-end in meaning: the client can read trailers.
    if accepts_trailers(&parts.headers) {
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
    }

    let host = match config.host_header {
        HostHeaderPolicy::Upstream => HeaderValue::from_str(origin.authority().as_str()).ok(),
        HostHeaderPolicy::Client => presented_host
            .and_then(|host| HeaderValue::from_str(host).ok())
            .or_else(|| HeaderValue::from_str(origin.authority().as_str()).ok()),
    };
    if let Some(host) = host {
        headers.insert(header::HOST, host);
    }

    if config.set_forwarded_headers {
        if let Some(ip) = peer.and_then(|addr| HeaderValue::from_str(&addr.ip().to_string()).ok()) {
            headers.insert(X_FORWARDED_FOR, ip);
        }
        if let Some(host) = presented_host.and_then(|host| HeaderValue::from_str(host).ok()) {
            headers.insert(X_FORWARDED_HOST, host);
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }

    let mut request = Request::new(body);
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    Ok(request)
}

fn accepts_trailers(incoming: &HeaderMap) -> bool {
    incoming
        .get_all(header::TE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|coding| coding.split(';').next())
        .any(|coding| coding.trim().eq_ignore_ascii_case("trailers"))
}

/// Copy of the client's headers minus hop-by-hop and forwarding headers.
fn outgoing_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = incoming.clone();

    // Headers named in `Connection` are hop-by-hop for this connection only.
    let named: Vec<HeaderName> = incoming
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in HOP_BY_HOP_HEADERS.iter().chain(FORWARDED_HEADERS.iter()) {
        headers.remove(name);
    }
    headers
}
