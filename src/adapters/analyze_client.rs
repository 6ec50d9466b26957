use crate::domain::model::{AnalysisResult, AnalyzeRequest};
use crate::domain::ports::AnalysisService;
use crate::utils::error::{PromptError, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Intake side of the analyze contract: POST the assessment as JSON and
/// decode the plan from a 2xx response.
pub struct HttpAnalysisService {
    client: Client,
    endpoint: String,
}

impl HttpAnalysisService {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        tracing::info!("📤 Submitting assessment to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Analyze endpoint returned HTTP {}", status);
            return Err(PromptError::SubmissionError {
                status: status.as_u16(),
            });
        }

        let result: AnalysisResult = response.json().await?;
        tracing::info!(
            "📥 Received plan: {} exercises, {} citations",
            result.exercise_protocol.len(),
            result.citations.len()
        );
        Ok(result)
    }
}
