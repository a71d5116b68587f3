//! Request identification.
//!
//! # Responsibilities
//! - Assign every inbound request an `x-request-id` (UUID v4)
//! - Keep an identifier the client already supplied
//!
//! # Design Decisions
//! - The id travels as an ordinary header, so the rewriter forwards it
//!   upstream and the propagate layer echoes it on the response

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates random v4 UUIDs for requests without an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
