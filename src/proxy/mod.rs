//! Proxy pipeline.
//!
//! # Data Flow
//! ```text
//! dispatcher.rs (host lookup, orchestration)
//!     → rewrite.rs (pure request rewrite)
//!     → forwarder.rs (pooled upstream round trip)
//!     → body.rs (deadline-bounded streaming body)
//! ```
//!
//! # Design Decisions
//! - Route table and pools are the only state shared between requests
//! - No retries, no buffering of request or response bodies
//! - Failures are values (`ForwardResult`), never panics

pub mod body;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod rewrite;

pub use dispatcher::{Dispatcher, ForwardResult};
pub use error::ForwardError;
pub use forwarder::UpstreamForwarder;
pub use rewrite::{rewrite, RewriteError};
