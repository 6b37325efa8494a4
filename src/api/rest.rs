// =============================================================================
// REST API endpoints - Axum 0.7
// =============================================================================
//
// `GET /api/data/:symbol` is the read path over the cached history; the
// `/api/v1/` routes expose liveness and collection status. Everything is a
// pure read over shared state; no endpoint mutates anything.
//
// CORS is configured permissively for development; tighten `allow_origin`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/data/:symbol", get(symbol_history))
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/predictions", get(predictions))
        .route("/api/v1/errors", get(errors))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// History read path
// =============================================================================

/// Full recorded history for one symbol, oldest first. 404 when the symbol
/// has never produced a reading.
async fn symbol_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    match state.history.snapshot(&symbol) {
        Some(readings) => Json(readings).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("no data for symbol {symbol}"),
            })),
        )
            .into_response(),
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    uptime_seconds: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Collection status
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

async fn predictions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_predictions.read().clone())
}

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors.read().clone())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::Reading;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(RuntimeConfig::default()))
    }

    fn reading(symbol: &str, price: f64) -> Reading {
        Reading {
            symbol: symbol.into(),
            price,
            volume: 1_000,
            timestamp: Utc::now(),
        }
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_symbol_returns_404() {
        let app = router(test_state());

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/data/TSLA")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("TSLA"));
    }

    #[tokio::test]
    async fn known_symbol_returns_history_in_order() {
        let state = test_state();
        for i in 0..3 {
            state.history.append(reading("AAPL", 100.0 + i as f64));
        }
        let app = router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/data/AAPL")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let readings: Vec<Reading> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].price, 100.0);
        assert_eq!(readings[2].price, 102.0);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(test_state());

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert!(body["state_version"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn state_snapshot_lists_all_tracked_symbols() {
        let state = test_state();
        state.history.append(reading("AAPL", 123.0));
        let app = router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/state")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["symbols"]["AAPL"]["history_len"], 1);
        assert_eq!(body["symbols"]["MSFT"]["history_len"], 0);
        assert_eq!(body["config"]["forward_threshold"], 5);
    }
}
