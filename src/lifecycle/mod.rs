//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     CLI → config → logging → route table → metrics → listener → serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bad route table exits before the listener opens
//! - Shutdown drains in-flight requests instead of cutting them

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::wait_for_shutdown_signal;
