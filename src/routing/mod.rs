//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → host.rs (extract host key)
//!     → table.rs (route lookup)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → origin.rs (parse upstream URL)
//!     → reject duplicate hosts
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - The table is a value passed to the dispatcher, not global state
//! - Deterministic: same host always matches same route

pub mod host;
pub mod origin;
pub mod table;

pub use host::host_key;
pub use origin::{OriginError, UpstreamOrigin};
pub use table::{Route, RouteError, RouteTable};
