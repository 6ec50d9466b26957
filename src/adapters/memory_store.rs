use crate::domain::model::{ScoredArticle, StoredDocument};
use crate::domain::ports::VectorStore;
use crate::utils::error::{PromptError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// Process-local vector store with brute-force cosine similarity. Used for
/// offline runs and tests; nothing survives a restart.
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<StoredDocument>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn query_terms(&self) -> Vec<Option<String>> {
        self.entries
            .read()
            .map(|e| e.iter().map(|d| d.query_term.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, document: &StoredDocument) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| PromptError::StorageError {
            message: "in-memory store lock poisoned".to_string(),
        })?;
        entries.push(document.clone());
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], match_count: usize) -> Result<Vec<ScoredArticle>> {
        let entries = self.entries.read().map_err(|_| PromptError::StorageError {
            message: "in-memory store lock poisoned".to_string(),
        })?;

        let mut scored: Vec<ScoredArticle> = entries
            .iter()
            .map(|doc| ScoredArticle {
                article: doc.article.clone(),
                similarity: cosine_similarity(query_embedding, &doc.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(match_count);
        Ok(scored)
    }
}
