//! HTTP surface of the analysis service. Routes are nested under `/api/v1`.

pub mod analyze;
pub mod error;
pub mod health;

use crate::config::ServerConfig;
use crate::domain::ports::AnalysisService;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn AnalysisService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

/// Credentials are allowed, so methods and headers mirror the request
/// instead of using wildcards.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/health", get(health::check))
        .route("/analyze", post(analyze::analyze))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
