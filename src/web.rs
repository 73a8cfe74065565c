//! Axum-based HTTP API
//!
//! Handlers never touch the estimator: reads come from the driver's snapshot
//! and config channels, overrides are sent to the driver as commands.

use crate::config::{Config, EstimatorConfig};
use crate::driver::{DriverCommand, GaugeSnapshot};
use crate::error::{GaugeError, Result};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub commands_tx: mpsc::UnboundedSender<DriverCommand>,
    pub snapshot_rx: watch::Receiver<Arc<GaugeSnapshot>>,
    /// Live configuration; the driver republishes it after a reconfigure
    pub config_rx: watch::Receiver<Arc<Config>>,
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot.as_ref().clone())
}

pub(crate) async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config_rx.borrow().clone();
    let json = serde_json::to_value(config.as_ref())
        .unwrap_or(serde_json::json!({"error":"serialization"}));
    Json(json)
}

/// Replace the estimator tuning. Validated here so the caller gets the
/// field error; the driver validates again before applying.
pub(crate) async fn put_estimator_config(
    State(state): State<AppState>,
    Json(estimator): Json<EstimatorConfig>,
) -> impl IntoResponse {
    if let Err(e) = estimator.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        );
    }
    send_command(&state, DriverCommand::Reconfigure(Box::new(estimator)))
}

fn send_command(state: &AppState, cmd: DriverCommand) -> (StatusCode, Json<serde_json::Value>) {
    match state.commands_tx.send(cmd) {
        Ok(()) => (StatusCode::ACCEPTED, Json(serde_json::json!({"ok":true}))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error":"driver not running"})),
        ),
    }
}

pub(crate) async fn anchor_full(State(state): State<AppState>) -> impl IntoResponse {
    send_command(&state, DriverCommand::ForceFullAnchor)
}

pub(crate) async fn anchor_empty(State(state): State<AppState>) -> impl IntoResponse {
    send_command(&state, DriverCommand::ForceEmptyAnchor)
}

pub(crate) async fn capacity_clear(State(state): State<AppState>) -> impl IntoResponse {
    send_command(&state, DriverCommand::ClearCapacity)
}

pub(crate) async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = WatchStream::new(state.snapshot_rx.clone()).filter_map(|snap| {
        match serde_json::to_string(snap.as_ref()) {
            Ok(payload) => Some(Ok::<Event, std::convert::Infallible>(
                Event::default().event("status").data(payload),
            )),
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/config", get(get_config))
        .route("/api/config/estimator", put(put_estimator_config))
        .route("/api/anchor/full", post(anchor_full))
        .route("/api/anchor/empty", post(anchor_empty))
        .route("/api/capacity/clear", post(capacity_clear))
        .route("/api/events", get(events))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GaugeError::web(format!("Failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .await
        .map_err(|e| GaugeError::web(format!("Server stopped: {}", e)))
}
