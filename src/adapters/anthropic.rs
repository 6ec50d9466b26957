use crate::config::AnthropicConfig;
use crate::domain::ports::LanguageModel;
use crate::utils::error::{PromptError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API，單輪 user 訊息
pub struct AnthropicClient {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!("🤖 Calling {} (max_tokens {})", self.model, self.max_tokens);
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let response = super::ensure_success("Anthropic", response).await?;
        let data: MessagesResponse = response.json().await?;

        data.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| PromptError::ModelResponseError {
                message: "response contained no text content".to_string(),
            })
    }
}
