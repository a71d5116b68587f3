//! Liveness endpoint.

use axum::response::Json;
use serde_json::{json, Value};

/// `GET /healthz`: always healthy while the process serves requests.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
