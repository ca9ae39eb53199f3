//! Health check endpoints

use crate::metrics::BotMetrics;
use crate::shard::ShardState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub guilds: u64,
    pub uptime_secs: Option<u64>,
    pub heartbeat_age_secs: Option<u64>,
    pub events_received: u64,
    pub members_joined: u64,
    pub commands_handled: u64,
}

impl ReadyResponse {
    pub fn from_state(state: &ShardState) -> Self {
        Self {
            ready: state.is_ready(),
            guilds: state.guilds(),
            uptime_secs: state.uptime_secs(),
            heartbeat_age_secs: state.heartbeat_age_secs(),
            events_received: state.events_received(),
            members_joined: state.members_joined(),
            commands_handled: state.commands_handled(),
        }
    }
}

/// Application state for health endpoints
#[derive(Clone)]
pub struct AppState {
    pub shard_state: ShardState,
    pub metrics: BotMetrics,
}

/// Create the health check router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health endpoint - always returns 200 if process is running
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness endpoint - returns 200 once the shard is ready
async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = ReadyResponse::from_state(&state.shard_state);

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Metrics endpoint - returns Prometheus format metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::ShardHealth;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
    }

    #[test]
    fn test_ready_response_tracks_shard() {
        let state = ShardState::new();
        let response = ReadyResponse::from_state(&state);
        assert!(!response.ready);
        assert_eq!(response.uptime_secs, None);

        state.set_health(ShardHealth::Ready);
        state.set_guilds(1);
        state.record_member_join();

        let json = serde_json::to_value(ReadyResponse::from_state(&state)).unwrap();
        assert_eq!(json["ready"], true);
        assert_eq!(json["guilds"], 1);
        assert_eq!(json["members_joined"], 1);
    }
}
