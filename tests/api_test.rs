use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use prompt_pt::api::{build_router, AppState};
use prompt_pt::config::ServerConfig;
use prompt_pt::domain::model::{AnalysisResult, AnalyzeRequest};
use prompt_pt::domain::ports::AnalysisService;
use prompt_pt::utils::error::{PromptError, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct StubService {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl AnalysisService for StubService {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PromptError::UpstreamStatusError {
                service: "Anthropic".to_string(),
                status: 529,
                body: "overloaded".to_string(),
            });
        }
        Ok(AnalysisResult {
            differential_diagnosis: vec![request.diagnosis.clone()],
            treatment_plan: "Progressive loading".to_string(),
            ..Default::default()
        })
    }
}

fn router(fail: bool) -> (axum::Router, Arc<StubService>) {
    let service = Arc::new(StubService {
        fail,
        calls: AtomicUsize::new(0),
    });
    let app = build_router(AppState::new(service.clone()), &ServerConfig::default());
    (app, service)
}

fn analyze_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let (app, _) = router(false);

    let response = app
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["app"], "promPT");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
    Ok(())
}

#[tokio::test]
async fn test_analyze_returns_result() {
    let (app, service) = router(false);

    let response = app
        .oneshot(analyze_request(json!({
            "symptoms": ["pain"],
            "diagnosis": "Patellofemoral pain",
            "healing_stage": "chronic",
            "functional_limitations": [],
            "pain_level": 4,
            "pain_with_movement": [],
            "tenderness_to_palpation": [],
            "constraints": []
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["differential_diagnosis"], json!(["Patellofemoral pain"]));
    assert_eq!(body["treatment_plan"], "Progressive loading");
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pain_level_out_of_range_is_422() {
    let (app, service) = router(false);

    let response = app
        .oneshot(analyze_request(json!({"diagnosis": "Low back pain", "pain_level": 11})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("pain_level:"));
    assert!(message.contains("between 0 and 10"));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_body_is_rejected_with_error_body() {
    let (app, _) = router(false);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/analyze")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_pipeline_failure_is_500_with_generic_message() {
    let (app, _) = router(true);

    let response = app
        .oneshot(analyze_request(json!({"diagnosis": "Rotator cuff tear", "pain_level": 5})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "ANALYSIS_FAILED");
    assert_eq!(body["error"]["message"], "Failed to generate treatment plan");
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let (app, _) = router(false);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/analyze")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let (app, _) = router(false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header(header::ORIGIN, "https://evil.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
