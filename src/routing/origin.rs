//! Upstream origin parsing.
//!
//! # Responsibilities
//! - Validate a configured upstream URL once, at startup
//! - Keep scheme, authority and base path exactly as written
//!
//! # Design Decisions
//! - `url` decides whether the text is an absolute URL with a host
//! - The base path is taken verbatim from the text, not from `Url::path()`,
//!   because `Url` normalizes an absent path to "/" and percent-encodes
//! - Userinfo is dropped; query and fragment are ignored

use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use url::Url;

/// Why an upstream URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OriginError {
    #[error("not an absolute URL: {0}")]
    Invalid(String),

    #[error("unsupported scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("missing authority")]
    MissingAuthority,
}

/// Backend server a route forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamOrigin {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl UpstreamOrigin {
    /// Parse an absolute `http`/`https` URL.
    pub fn parse(raw: &str) -> Result<Self, OriginError> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|e| OriginError::Invalid(e.to_string()))?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(OriginError::UnsupportedScheme(other.to_string())),
        };
        if url.cannot_be_a_base() || url.host_str().map_or(true, str::is_empty) {
            return Err(OriginError::MissingAuthority);
        }

        // `Url` accepted it, so "scheme://" is present.
        let rest = raw
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or(OriginError::MissingAuthority)?;
        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        let authority =
            Authority::from_str(authority).map_err(|e| OriginError::Invalid(e.to_string()))?;

        let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
        let base_path = &tail[..path_end];
        if !base_path.is_empty() {
            PathAndQuery::from_str(base_path).map_err(|e| OriginError::Invalid(e.to_string()))?;
        }

        Ok(Self {
            scheme,
            authority,
            base_path: base_path.to_string(),
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Path prefix prepended verbatim to every forwarded path. Empty when
    /// the configured URL has no path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl fmt::Display for UpstreamOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.base_path)
    }
}
