//! Upstream failure taxonomy.
//!
//! # Design Decisions
//! - Every failure kind is distinct so the caller can pick status and log line
//! - Connect, TLS and reset failures map to 502, timeouts to 504
//! - Classification walks the error source chain; `io::Error` hides its
//!   payload from `source()`, so `get_ref()` is checked as well

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use axum::http::StatusCode;

/// Failure of a single upstream exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("upstream connect failed: {0}")]
    ConnectFailed(String),

    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("upstream TLS error: {0}")]
    Tls(String),

    #[error("upstream connection reset: {0}")]
    UpstreamReset(String),
}

impl ForwardError {
    pub(crate) fn deadline(after: Duration) -> Self {
        ForwardError::Timeout(format!("no complete response within {}ms", after.as_millis()))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::ConnectFailed(_) => "connect_failed",
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Tls(_) => "tls_error",
            ForwardError::UpstreamReset(_) => "upstream_reset",
        }
    }

    /// Status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message placed in the JSON error body.
    pub fn public_message(&self) -> &'static str {
        match self {
            ForwardError::ConnectFailed(_) => "upstream unavailable",
            ForwardError::Timeout(_) => "upstream timeout",
            ForwardError::Tls(_) => "upstream tls error",
            ForwardError::UpstreamReset(_) => "upstream connection reset",
        }
    }

    /// Classify a transport error from the upstream client.
    pub fn classify(err: &hyper_util::client::legacy::Error) -> Self {
        let message = describe(err);

        let chain = || {
            std::iter::successors(
                Some(err as &(dyn StdError + 'static)),
                |e: &&(dyn StdError + 'static)| (*e).source(),
            )
        };

        if chain().any(is_tls_error) {
            ForwardError::Tls(message)
        } else if chain().any(is_timeout) {
            ForwardError::Timeout(message)
        } else if err.is_connect() {
            ForwardError::ConnectFailed(message)
        } else {
            ForwardError::UpstreamReset(message)
        }
    }
}

fn is_tls_error(err: &(dyn StdError + 'static)) -> bool {
    if err.is::<rustls::Error>() {
        return true;
    }
    err.downcast_ref::<io::Error>()
        .and_then(|io| io.get_ref())
        .is_some_and(|inner| inner.is::<rustls::Error>())
}

fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io| io.kind() == io::ErrorKind::TimedOut)
}

/// Render an error with its causes, "outer: inner: root".
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
