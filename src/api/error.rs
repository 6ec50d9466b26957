use crate::utils::error::{PromptError, GENERIC_FAILURE_MESSAGE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// HTTP 層錯誤，回應主體固定為 `{"error": {"code", "message"}}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },
    #[error("Invalid field {field}: {message}")]
    Unprocessable { field: &'static str, message: String },
    #[error("Analysis failed: {0}")]
    Analysis(#[from] PromptError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::InvalidBody { status, message } => (status, "INVALID_BODY", message),
            ApiError::Unprocessable { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                format!("{}: {}", field, message),
            ),
            ApiError::Analysis(err) => {
                tracing::error!(
                    "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                    err,
                    err.category(),
                    err.severity()
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ANALYSIS_FAILED",
                    GENERIC_FAILURE_MESSAGE.to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = ApiError::Unprocessable {
            field: "pain_level",
            message: "out of range".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ApiError::from(PromptError::ModelResponseError {
            message: "no json".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
