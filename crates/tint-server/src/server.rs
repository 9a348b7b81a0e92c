//! `TintServer`: Axum HTTP + WebSocket server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::coordinator::BroadcastCoordinator;
use crate::websocket::heartbeat::{LivenessMonitor, MonitorHandle};
use crate::websocket::registry::ConnectionRegistry;
use crate::websocket::session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Smoothing engine, shared color, and registry.
    pub coordinator: Arc<BroadcastCoordinator>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Renders `/metrics`.
    pub metrics: PrometheusHandle,
    /// Serves `public_dir` for non-upgrade requests on unrouted paths.
    pub static_files: ServeDir,
}

/// The relay server.
pub struct TintServer {
    config: Arc<ServerConfig>,
    coordinator: Arc<BroadcastCoordinator>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: PrometheusHandle,
    monitor: Mutex<Option<MonitorHandle>>,
}

impl TintServer {
    /// Create a new server. Nothing is bound until [`listen`](Self::listen).
    pub fn new(config: ServerConfig, metrics: PrometheusHandle) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let coordinator = Arc::new(BroadcastCoordinator::new(config.smoothing, registry));
        Self {
            config: Arc::new(config),
            coordinator,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
            monitor: Mutex::new(None),
        }
    }

    fn state(&self) -> AppState {
        AppState {
            coordinator: Arc::clone(&self.coordinator),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            static_files: ServeDir::new(&self.config.public_dir),
        }
    }

    /// Build the Axum router with all routes.
    ///
    /// A WebSocket upgrade is accepted on any path that is not an API
    /// route. Plain requests to those paths are served from `public_dir`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .fallback(fallback_handler)
            .with_state(self.state())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind, start the liveness monitor, and serve on a background task.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task,
    /// which completes after [`shutdown`](Self::shutdown).
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;

        let monitor = LivenessMonitor::spawn(
            Arc::clone(self.coordinator.registry()),
            self.config.liveness_interval,
            self.shutdown.token().child_token(),
        );
        if let Some(previous) = self.monitor.lock().replace(monitor) {
            previous.stop_detached();
        }

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });

        info!(
            %addr,
            liveness_interval_secs = self.config.liveness_interval.as_secs(),
            buffer_size = self.config.smoothing.buffer_size(),
            confidence_threshold = self.config.smoothing.confidence_threshold(),
            "tint relay listening"
        );
        Ok((addr, handle))
    }

    /// Close every connection, stop accepting, and stop the liveness monitor.
    pub async fn shutdown(&self) {
        let closed = self.coordinator.registry().close_all();
        self.shutdown.shutdown();
        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            monitor.stop().await;
        }
        info!(closed, "server shut down");
    }

    /// Get the broadcast coordinator.
    pub fn coordinator(&self) -> &Arc<BroadcastCoordinator> {
        &self.coordinator
    }

    /// Get the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let color = state.coordinator.current_color();
    let clients = state.coordinator.registry().connection_count();
    Json(health::health_check(state.start_time, color, clients))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state)
}

/// Every other path: upgrade when asked to, otherwise a static file.
async fn fallback_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    req: Request,
) -> Response {
    match ws {
        Ok(ws) => upgrade(ws, state),
        Err(_) => match state.static_files.clone().oneshot(req).await {
            Ok(resp) => resp.into_response(),
            Err(never) => match never {},
        },
    }
}

fn upgrade(ws: WebSocketUpgrade, state: AppState) -> Response {
    if state.shutdown.is_shutting_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.max_message_size(state.config.max_message_size)
        .max_frame_size(state.config.max_message_size)
        .on_upgrade(move |socket| session::handle_socket(socket, state))
}
