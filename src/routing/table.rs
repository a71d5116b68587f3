//! Route lookup.
//!
//! # Responsibilities
//! - Compile route configs into an immutable host → route map
//! - Look up the route for a host key
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap
//! - Host keys are ASCII-lowercased on both sides; the port is part of the key
//! - Duplicate host keys are rejected, never silently overridden

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RouteConfig;
use crate::routing::origin::{OriginError, UpstreamOrigin};

/// Error building the route table. Fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route #{index} ({host}): invalid upstream {upstream:?}: {source}")]
    InvalidUpstream {
        index: usize,
        host: String,
        upstream: String,
        #[source]
        source: OriginError,
    },

    #[error("route #{second} duplicates host {host:?} already defined by route #{first}")]
    DuplicateHost {
        host: String,
        first: usize,
        second: usize,
    },
}

/// A compiled host route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    index: usize,
    host_key: String,
    origin: UpstreamOrigin,
}

impl Route {
    pub(crate) fn new(index: usize, host_key: impl Into<String>, origin: UpstreamOrigin) -> Self {
        Self {
            index,
            host_key: normalize_host(&host_key.into()),
            origin,
        }
    }

    /// Position of the route in its configuration, and in `RouteTable::iter`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The normalized `Host` value this route answers to.
    pub fn host_key(&self) -> &str {
        &self.host_key
    }

    pub fn origin(&self) -> &UpstreamOrigin {
        &self.origin
    }
}

/// Immutable host → route mapping, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    by_host: HashMap<String, Arc<Route>>,
}

impl RouteTable {
    /// Compile an ordered list of route configs.
    ///
    /// Fails on the first unparsable upstream or duplicated host; no
    /// partial table is ever returned.
    pub fn build(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut routes = Vec::with_capacity(configs.len());
        let mut by_host: HashMap<String, Arc<Route>> = HashMap::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            let origin = UpstreamOrigin::parse(&config.upstream).map_err(|source| {
                RouteError::InvalidUpstream {
                    index,
                    host: config.host.clone(),
                    upstream: config.upstream.clone(),
                    source,
                }
            })?;

            let route = Arc::new(Route::new(index, &config.host, origin));
            if let Some(first) = by_host.get(route.host_key()) {
                return Err(RouteError::DuplicateHost {
                    host: route.host_key.clone(),
                    first: first.index,
                    second: index,
                });
            }

            by_host.insert(route.host_key.clone(), route.clone());
            routes.push(route);
        }

        Ok(Self { routes, by_host })
    }

    /// Look up the route for a presented host.
    pub fn lookup(&self, host: &str) -> Option<&Arc<Route>> {
        if host.bytes().any(|b| b.is_ascii_uppercase()) {
            self.by_host.get(&host.to_ascii_lowercase())
        } else {
            self.by_host.get(host)
        }
    }

    /// Routes in configuration order; the n-th route has index n.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().to_ascii_lowercase()
}
