use crate::config::VoyageConfig;
use crate::domain::ports::Embedder;
use crate::utils::error::{PromptError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Voyage AI 向量化；文件與查詢使用不同的 input_type
pub struct VoyageEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl VoyageEmbedder {
    pub fn new(config: &VoyageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/embeddings", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn embed(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            input: texts,
            model: &self.model,
            input_type,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = super::ensure_success("Voyage", response).await?;
        let mut data: EmbeddingResponse = response.json().await?;

        if data.data.len() != texts.len() {
            return Err(PromptError::ProcessingError {
                message: format!(
                    "Voyage returned {} embeddings for {} inputs",
                    data.data.len(),
                    texts.len()
                ),
            });
        }

        data.data.sort_by_key(|d| d.index);
        Ok(data.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tracing::debug!("Embedding {} documents", texts.len());
        self.embed(texts, "document").await
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed(&[query.to_string()], "query").await?;
        embeddings.pop().ok_or_else(|| PromptError::ProcessingError {
            message: "Voyage returned no embedding for query".to_string(),
        })
    }
}
