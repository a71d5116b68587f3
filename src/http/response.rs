//! Mapping dispatch outcomes to client responses.
//!
//! # Design Decisions
//! - Responses the proxy produces itself carry `{"error": "<message>"}`
//! - Upstream responses pass through untouched
//! - Failures attach `RequestErrors` so the access log can report them

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::observability::access_log::RequestErrors;
use crate::proxy::ForwardResult;

pub const PROXY_NOT_FOUND: &str = "proxy not found";

/// JSON error response with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for ForwardResult {
    fn into_response(self) -> Response {
        let (mut response, errors) = match self {
            ForwardResult::Forwarded(response) => return response,
            ForwardResult::NotFound { host } => {
                let detail = match host {
                    Some(host) => format!("{PROXY_NOT_FOUND}: {host}"),
                    None => format!("{PROXY_NOT_FOUND}: missing host"),
                };
                (
                    json_error(StatusCode::NOT_FOUND, PROXY_NOT_FOUND),
                    RequestErrors::single(detail),
                )
            }
            ForwardResult::UpstreamFailure(err) => (
                json_error(err.status(), err.public_message()),
                RequestErrors::single(err.to_string()),
            ),
            ForwardResult::Rejected(err) => (
                json_error(StatusCode::BAD_GATEWAY, "invalid upstream request"),
                RequestErrors::single(err.to_string()),
            ),
        };

        response.extensions_mut().insert(errors);
        response
    }
}
