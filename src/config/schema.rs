//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Inject permissive CORS headers into every response.
    pub enable_cors: bool,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request rewrite behaviour.
    pub proxy: RewriteConfig,

    /// Host to upstream mappings, in configuration order.
    #[serde(alias = "proxies")]
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream connection pool settings.
    pub pool: PoolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A single host route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// `Host` header value a client must present.
    pub host: String,

    /// Absolute upstream URL (e.g., "http://10.0.0.1:8080/api").
    pub upstream: String,
}

impl RouteConfig {
    pub fn new(host: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            upstream: upstream.into(),
        }
    }
}

/// Which value the outgoing `Host` header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HostHeaderPolicy {
    /// The upstream origin's authority.
    #[default]
    Upstream,
    /// The host the client presented.
    Client,
}

/// Request rewrite configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RewriteConfig {
    /// Outgoing `Host` header policy.
    pub host_header: HostHeaderPolicy,

    /// Write fresh X-Forwarded-* headers after stripping the client's.
    pub set_forwarded_headers: bool,
}

/// Timeout configuration for upstream exchanges.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// End-to-end deadline (response headers and body) in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            idle_secs: 90,
        }
    }
}

/// Per-route connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum idle connections kept per upstream host.
    pub max_idle_per_host: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 32,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert!(!config.enable_cors);
        assert!(config.routes.is_empty());
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.proxy.host_header, HostHeaderPolicy::Upstream);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn parses_routes_and_policies() {
        let config: ProxyConfig = toml::from_str(
            r#"
            enable_cors = true

            [proxy]
            host_header = "client"
            set_forwarded_headers = true

            [observability]
            log_format = "json"

            [[routes]]
            host = "a.example.com"
            upstream = "http://10.0.0.1:8080/api"

            [[routes]]
            host = "b.example.com"
            upstream = "https://backend.internal"
            "#,
        )
        .unwrap();

        assert!(config.enable_cors);
        assert_eq!(config.proxy.host_header, HostHeaderPolicy::Client);
        assert!(config.proxy.set_forwarded_headers);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(
            config.routes,
            vec![
                RouteConfig::new("a.example.com", "http://10.0.0.1:8080/api"),
                RouteConfig::new("b.example.com", "https://backend.internal"),
            ]
        );
    }

    #[test]
    fn accepts_proxies_alias() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[proxies]]
            host = "a.example.com"
            upstream = "http://127.0.0.1:3000"
            "#,
        )
        .unwrap();
        assert_eq!(config.routes.len(), 1);
    }
}
