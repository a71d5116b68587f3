//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, middleware stack)
//!     → request.rs (request ID)
//!     → health.rs (GET /healthz) | Dispatcher (everything else)
//!     → response.rs (ForwardResult → status + body)
//!     → Send to client
//! ```

pub mod cors;
pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::json_error;
pub use server::{build_router, HttpServer};
