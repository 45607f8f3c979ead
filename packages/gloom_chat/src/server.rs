//! HTTP server: routes, static assets and the chat hub wiring.

use axum::{Router, http::Method, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::config::{AppConfig, RelayConfig, ServerConfig};
use crate::error::{RelayError, Result};
use crate::handlers;
use crate::metrics::ServerMetrics;
use crate::relay::{ChatHub, HubHandle};

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    /// Server metrics for observability
    pub metrics: Arc<ServerMetrics>,
    pub relay_config: Arc<RelayConfig>,
}

impl AppState {
    /// Spawn a hub for `relay_config` and bundle it with fresh metrics.
    pub fn new(relay_config: RelayConfig) -> Self {
        let metrics = Arc::new(ServerMetrics::new());
        let hub = ChatHub::spawn(&relay_config, metrics.clone());
        Self {
            hub,
            metrics,
            relay_config: Arc::new(relay_config),
        }
    }
}

pub fn build_router(state: AppState, server_config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/ws", get(handlers::chat_websocket_handler))
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/api/metrics", get(handlers::metrics_handler))
        .route_service("/", ServeFile::new(&server_config.index_file))
        .fallback_service(ServeDir::new(&server_config.static_dir))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(cors)
        .with_state(state)
}

/// A bound, not yet running chat server.
pub struct ChatServer {
    listener: TcpListener,
    router: Router,
}

impl ChatServer {
    pub async fn bind(config: AppConfig) -> Result<Self> {
        let addr = config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!(
            "Relay config: history_limit={}, send_queue={}",
            config.relay.history_limit, config.relay.send_channel_capacity
        );
        let state = AppState::new(config.relay);
        let router = build_router(state, &config.server);

        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(RelayError::Serve)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let actual_addr = self.local_addr()?;
        info!("Gloom Chat listening on http://{}", actual_addr);
        info!("  GET /        - chat page");
        info!("  GET /ws      - chat WebSocket");
        info!("  GET /health  - relay status");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(RelayError::Serve)
    }
}
