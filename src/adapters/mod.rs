// Adapters layer: concrete implementations of the domain ports for external
// systems (HTTP APIs, vector stores, local files).

pub mod analyze_client;
pub mod anthropic;
pub mod memory_store;
pub mod pubmed;
pub mod storage;
pub mod supabase;
pub mod voyage;

use crate::config::{AppConfig, VectorBackend};
use crate::domain::ports::VectorStore;
use crate::utils::error::{PromptError, Result};
use std::sync::Arc;

/// Pick the vector store named by `vector_store.backend`.
pub fn vector_store_from_config(config: &AppConfig) -> Arc<dyn VectorStore> {
    match config.vector_store.backend {
        VectorBackend::Supabase => Arc::new(supabase::SupabaseVectorStore::new(&config.supabase)),
        VectorBackend::Memory => {
            tracing::warn!("⚠️ Using the in-memory vector store, documents are lost on exit");
            Arc::new(memory_store::InMemoryVectorStore::new())
        }
    }
}

/// Turn a non-2xx response into an upstream error carrying the body text.
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{} error body: {}", service, body);
    Err(PromptError::UpstreamStatusError {
        service: service.to_string(),
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    })
}
