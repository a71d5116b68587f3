//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject obviously broken route entries before the route table is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - URL parsing and duplicate detection belong to `RouteTable::build`

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("route #{index}: host must not be empty or contain whitespace")]
    InvalidHost { index: usize },

    #[error("route #{index} ({host}): upstream must not be empty")]
    EmptyUpstream { index: usize, host: String },
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("request_secs", timeouts.request_secs),
        ("idle_secs", timeouts.idle_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    for (index, route) in config.routes.iter().enumerate() {
        if route.host.is_empty() || route.host.chars().any(char::is_whitespace) {
            errors.push(ValidationError::InvalidHost { index });
        }
        if route.upstream.trim().is_empty() {
            errors.push(ValidationError::EmptyUpstream {
                index,
                host: route.host.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
