//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: `/healthz` plus the proxy fallback
//! - Wire up middleware (tracing, request ID, access log, CORS)
//! - Bind to the listener and drain on shutdown
//!
//! # Design Decisions
//! - Every path except `GET /healthz` is proxied, whatever the method
//! - `/healthz` answers for any `Host`, even with an empty route table
//! - Request IDs are set before the access log runs so it can report them

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tracing::Level;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnFailure, TraceLayer},
};

use crate::config::ProxyConfig;
use crate::http::cors::cors_layer;
use crate::http::health::healthz;
use crate::http::request::MakeRequestUuidV4;
use crate::lifecycle::ShutdownListener;
use crate::observability::access_log::access_log;
use crate::proxy::Dispatcher;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &ProxyConfig, dispatcher: Arc<Dispatcher>) -> Router {
    let router = Router::new()
        .route("/healthz", get(healthz).fallback(proxy_handler))
        .fallback(proxy_handler)
        .with_state(AppState { dispatcher });

    let router = if config.enable_cors {
        router.layer(cors_layer())
    } else {
        router
    };

    router
        .layer(middleware::from_fn(access_log))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
        // Failures are reported once, by the access log.
        .layer(
            TraceLayer::new_for_http()
                .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
        )
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    routes: usize,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let routes = dispatcher.table().len();
        Self {
            router: build_router(config, dispatcher),
            routes,
        }
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, routes = self.routes, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: everything that is not the health check.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    state.dispatcher.dispatch(request, peer).await.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteTable;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn router_with(config: ProxyConfig) -> Router {
        let table = RouteTable::build(&config.routes).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(table, &config).unwrap());
        build_router(&config, dispatcher)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(method: Method, host: &str, path: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn healthz_with_empty_table() {
        let router = router_with(ProxyConfig::default());

        let response = router
            .oneshot(request(Method::GET, "whatever.invalid", "/healthz"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn unknown_host_is_not_found() {
        let router = router_with(ProxyConfig::default());

        let response = router
            .oneshot(request(Method::GET, "unknown.example.com", "/x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, r#"{"error":"proxy not found"}"#);
    }

    #[tokio::test]
    async fn non_get_healthz_is_proxied() {
        let router = router_with(ProxyConfig::default());

        let response = router
            .oneshot(request(Method::POST, "unknown.example.com", "/healthz"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, r#"{"error":"proxy not found"}"#);
    }

    #[tokio::test]
    async fn request_id_is_generated_and_echoed() {
        let router = router_with(ProxyConfig::default());

        let response = router
            .clone()
            .oneshot(request(Method::GET, "a", "/healthz"))
            .await
            .unwrap();
        let generated = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());

        let mut supplied = request(Method::GET, "a", "/healthz");
        supplied
            .headers_mut()
            .insert("x-request-id", "client-id-1".parse().unwrap());
        let response = router.oneshot(supplied).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "client-id-1");
    }

    #[tokio::test]
    async fn cors_headers_only_when_enabled() {
        let mut with_origin = request(Method::GET, "a", "/healthz");
        with_origin
            .headers_mut()
            .insert(header::ORIGIN, "https://app.example.com".parse().unwrap());

        let response = router_with(ProxyConfig::default())
            .oneshot(with_origin)
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());

        let config = ProxyConfig {
            enable_cors: true,
            ..ProxyConfig::default()
        };
        let mut with_origin = request(Method::GET, "a", "/healthz");
        with_origin
            .headers_mut()
            .insert(header::ORIGIN, "https://app.example.com".parse().unwrap());

        let response = router_with(config).oneshot(with_origin).await.unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        let exposed = headers[header::ACCESS_CONTROL_EXPOSE_HEADERS]
            .to_str()
            .unwrap();
        assert!(exposed.contains("etag"));
        assert!(exposed.contains("last-modified"));
    }

    #[tokio::test]
    async fn preflight_is_answered_locally() {
        let config = ProxyConfig {
            enable_cors: true,
            ..ProxyConfig::default()
        };
        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/anything")
            .header(header::HOST, "unknown.example.com")
            .header(header::ORIGIN, "https://app.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom")
            .body(Body::empty())
            .unwrap();

        let response = router_with(config).oneshot(preflight).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-custom");
        assert!(headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("PATCH"));
    }
}
