//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling produces:
//!     → access_log.rs (one record per request, severity by status)
//!     → logging.rs (subscriber: pretty or JSON)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (upstream spans)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows from the request-id layer into the access log
//! - Observability never changes what the client receives

pub mod access_log;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use access_log::{access_log, RequestErrors, Severity};
