//! Host key extraction.
//!
//! # Design Decisions
//! - The `Host` header is the routing key, never the request-target
//! - HTTP/2 carries the host in `:authority`; it is used only when no
//!   `Host` header was sent
//! - Non-UTF-8 or empty values are treated as "no host"

use axum::http::{header, request::Parts, Version};

/// Extract the routing key a client presented.
pub fn host_key(parts: &Parts) -> Option<&str> {
    if let Some(value) = parts.headers.get(header::HOST) {
        return value
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|host| !host.is_empty());
    }

    if parts.version == Version::HTTP_2 {
        return parts.uri.authority().map(|authority| authority.as_str());
    }

    None
}
