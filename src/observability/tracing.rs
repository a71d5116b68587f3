//! Spans around upstream calls.
//!
//! # Design Decisions
//! - One span per upstream round trip, carrying route, method and target URL
//! - Purely observational: the span never changes the exchange

use axum::http::{Method, Uri};
use tracing::Span;

/// Span wrapping a single upstream round trip.
pub fn upstream_span(route: &str, method: &Method, uri: &Uri) -> Span {
    tracing::info_span!("upstream", route = %route, method = %method, url = %uri)
}
