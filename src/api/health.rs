use crate::api::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "promPT";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub app: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// `GET /api/v1/health`
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        app: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
