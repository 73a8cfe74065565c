#![cfg(test)]

use super::web::*;
use crate::config::{Config, EstimatorConfig};
use crate::driver::{DriverCommand, GaugeSnapshot};
use crate::persistence::MemoryStore;
use crate::store::GaugeStore;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tower::ServiceExt;

fn test_snapshot() -> GaugeSnapshot {
    let store = GaugeStore::open(
        EstimatorConfig::default(),
        Box::new(MemoryStore::new()),
        "pack0",
        Duration::from_secs(60),
    );
    let out = store.outputs();
    GaugeSnapshot {
        timestamp: chrono::Utc::now().to_rfc3339(),
        instance_id: "pack0".to_string(),
        driver_state: "Running".to_string(),
        outputs: out,
        rest_seconds: 12.5,
        full_anchor_seen: false,
        discharged_since_full_mah: 0.0,
        full_hold_s: 0.0,
        empty_hold_s: 4.0,
        vmin_cell_mv: Some(3650.0),
        vavg_cell_mv: Some(3680.0),
        current_ma: Some(120.0),
        last_dt_s: Some(0.25),
        balancing_cells: 0,
        startup_state: store.startup_state(),
        total_polls: 7,
        read_failures: 1,
        save_failures: 0,
        poll_interval_ms: 250,
    }
}

fn test_state() -> (
    AppState,
    mpsc::UnboundedReceiver<DriverCommand>,
    watch::Sender<Arc<GaugeSnapshot>>,
) {
    let (state, commands_rx, snapshot_tx, _config_tx) = test_state_with_config();
    (state, commands_rx, snapshot_tx)
}

fn test_state_with_config() -> (
    AppState,
    mpsc::UnboundedReceiver<DriverCommand>,
    watch::Sender<Arc<GaugeSnapshot>>,
    watch::Sender<Arc<Config>>,
) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(test_snapshot()));
    let (config_tx, config_rx) = watch::channel(Arc::new(Config::default()));
    let state = AppState {
        commands_tx,
        snapshot_rx,
        config_rx,
    };
    (state, commands_rx, snapshot_tx, config_tx)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn put_json(uri: &str, body: &serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn post(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_ok() {
    let (state, _rx, _tx) = test_state();
    let response = build_router(state)
        .oneshot(get("/api/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_reflects_latest_snapshot() {
    let (state, _rx, snapshot_tx) = test_state();
    let router = build_router(state);

    let mut updated = test_snapshot();
    updated.outputs.soc_percent = Some(64.0);
    updated.outputs.soc_valid = true;
    updated.total_polls = 8;
    snapshot_tx.send_replace(Arc::new(updated));

    let response = router.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["soc_percent"], 64.0);
    assert_eq!(json["soc_valid"], true);
    assert_eq!(json["total_polls"], 8);
    assert_eq!(json["instance_id"], "pack0");
    assert!(json.get("capacity_mah").is_some());
    assert_eq!(json["empty_hold_s"], 4.0);
}

#[tokio::test]
async fn config_is_served() {
    let (state, _rx, _tx) = test_state();
    let response = build_router(state)
        .oneshot(get("/api/config"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["instance_id"], "pack0");
    assert!(json["estimator"]["ocv_table"].is_array());
}

#[tokio::test]
async fn config_follows_reconfigure() {
    let (state, _rx, _snap, config_tx) = test_state_with_config();
    let router = build_router(state);

    let mut updated = Config::default();
    updated.estimator.full_cell_mv = 4050.0;
    config_tx.send_replace(Arc::new(updated));

    let response = router.oneshot(get("/api/config")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["estimator"]["full_cell_mv"], 4050.0);
}

#[tokio::test]
async fn estimator_config_is_forwarded() {
    let (state, mut rx, _tx) = test_state();
    let mut estimator = EstimatorConfig::default();
    estimator.learn_alpha = 0.5;
    let body = serde_json::to_value(&estimator).unwrap();

    let response = build_router(state)
        .oneshot(put_json("/api/config/estimator", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    match rx.recv().await {
        Some(DriverCommand::Reconfigure(cfg)) => assert_eq!(cfg.learn_alpha, 0.5),
        other => panic!("expected reconfigure, got {:?}", other),
    }
}

#[tokio::test]
async fn invalid_estimator_config_is_rejected() {
    let (state, mut rx, _tx) = test_state();
    let body = serde_json::json!({"learn_alpha": 3.0});

    let response = build_router(state)
        .oneshot(put_json("/api/config/estimator", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("learn_alpha"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn serve_reports_bind_failure() {
    let (state, _rx, _tx) = test_state();
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let err = serve(state, "127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, crate::error::GaugeError::Web { .. }));
}

#[tokio::test]
async fn overrides_are_forwarded_as_commands() {
    let (state, mut rx, _tx) = test_state();
    let router = build_router(state);

    for uri in [
        "/api/anchor/full",
        "/api/anchor/empty",
        "/api/capacity/clear",
    ] {
        let response = router.clone().oneshot(post(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    assert!(matches!(rx.recv().await, Some(DriverCommand::ForceFullAnchor)));
    assert!(matches!(rx.recv().await, Some(DriverCommand::ForceEmptyAnchor)));
    assert!(matches!(rx.recv().await, Some(DriverCommand::ClearCapacity)));
}

#[tokio::test]
async fn overrides_fail_when_driver_is_gone() {
    let (state, rx, _tx) = test_state();
    drop(rx);
    let response = build_router(state)
        .oneshot(post("/api/anchor/full"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn anchor_routes_reject_get() {
    let (state, _rx, _tx) = test_state();
    let response = build_router(state)
        .oneshot(get("/api/anchor/full"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn events_stream_is_sse() {
    let (state, _rx, _tx) = test_state();
    let response = build_router(state)
        .oneshot(get("/api/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));
}
