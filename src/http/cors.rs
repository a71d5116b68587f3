//! Cross-origin headers.
//!
//! # Design Decisions
//! - Credentials are allowed, so origin and request headers are mirrored
//!   back instead of answered with `*`
//! - Preflight requests are answered here and never reach an upstream

use axum::http::{header, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Permissive CORS layer used when `enable_cors` is set.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::ETAG,
            header::LAST_MODIFIED,
        ])
}
