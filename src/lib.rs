//! Host-based HTTP reverse proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{Dispatcher, ForwardResult};
pub use routing::RouteTable;
