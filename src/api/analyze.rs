use crate::api::error::ApiError;
use crate::api::AppState;
use crate::domain::model::{AnalysisResult, AnalyzeRequest};
use crate::utils::validation::validate_range;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

pub const MAX_PAIN_LEVEL: f64 = 10.0;

fn validate_request(request: &AnalyzeRequest) -> Result<(), ApiError> {
    validate_range("pain_level", request.pain_level, 0.0, MAX_PAIN_LEVEL).map_err(|e| {
        ApiError::Unprocessable {
            field: "pain_level",
            message: e.to_string(),
        }
    })
}

/// `POST /api/v1/analyze`
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidBody {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    validate_request(&request)?;

    tracing::info!(
        "🩺 Analyze request: diagnosis='{}', stage={}, pain={}",
        request.diagnosis,
        request.healing_stage,
        request.pain_level
    );

    let result = state.service.analyze(&request).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pain_level: f64) -> AnalyzeRequest {
        AnalyzeRequest {
            symptoms: vec![],
            diagnosis: "Patellofemoral pain".to_string(),
            healing_stage: Default::default(),
            functional_limitations: vec![],
            pain_level,
            pain_with_movement: vec![],
            tenderness_to_palpation: vec![],
            constraints: vec![],
        }
    }

    #[test]
    fn test_pain_level_bounds_are_inclusive() {
        assert!(validate_request(&request(0.0)).is_ok());
        assert!(validate_request(&request(MAX_PAIN_LEVEL)).is_ok());
    }

    #[test]
    fn test_pain_level_outside_bounds_names_the_field() {
        for pain_level in [-1.0, 10.5] {
            match validate_request(&request(pain_level)) {
                Err(ApiError::Unprocessable { field, message }) => {
                    assert_eq!(field, "pain_level");
                    assert!(message.contains("between 0 and 10"), "{}", message);
                }
                other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
            }
        }
    }
}
