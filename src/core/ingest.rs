use crate::domain::model::{IngestBatch, ResearchArticle, StoredDocument};
use crate::domain::ports::{Embedder, Pipeline, ResearchSource, Storage, VectorStore};
use crate::utils::error::{PromptError, Result};
use crate::utils::monitor::SystemMonitor;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 單一病症的研究攝取：抓取 -> 去重標記 -> 嵌入後寫入向量庫
pub struct ResearchPipeline {
    condition: String,
    max_results: usize,
    source: Arc<dyn ResearchSource>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl ResearchPipeline {
    pub fn new(
        condition: String,
        max_results: usize,
        source: Arc<dyn ResearchSource>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            condition,
            max_results,
            source,
            embedder,
            store,
        }
    }
}

#[async_trait]
impl Pipeline for ResearchPipeline {
    async fn extract(&self) -> Result<Vec<ResearchArticle>> {
        tracing::info!("📡 {}: Searching for {}", self.source.name(), self.condition);
        self.source
            .fetch_research(&self.condition, self.max_results)
            .await
    }

    async fn transform(&self, data: Vec<ResearchArticle>) -> Result<IngestBatch> {
        let mut seen = HashSet::new();
        let articles: Vec<ResearchArticle> = data
            .into_iter()
            .filter(|a| a.pmid.is_empty() || seen.insert(a.pmid.clone()))
            .collect();

        Ok(IngestBatch {
            query_term: Some(self.condition.clone()),
            articles,
        })
    }

    async fn load(&self, batch: IngestBatch) -> Result<usize> {
        if batch.articles.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = batch.articles.iter().map(|a| a.embedding_text()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != batch.articles.len() {
            return Err(PromptError::ProcessingError {
                message: format!(
                    "expected {} embeddings, got {}",
                    batch.articles.len(),
                    embeddings.len()
                ),
            });
        }

        let count = batch.articles.len();
        for (article, embedding) in batch.articles.into_iter().zip(embeddings) {
            self.store
                .insert(&StoredDocument {
                    article,
                    embedding,
                    query_term: batch.query_term.clone(),
                })
                .await?;
        }

        tracing::debug!("💾 Stored {} documents in vector store", count);
        Ok(count)
    }
}

pub struct IngestEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> IngestEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<usize> {
        let raw = self.pipeline.extract().await?;
        tracing::debug!("📥 Extracted {} articles", raw.len());

        let batch = self.pipeline.transform(raw).await?;
        tracing::debug!("🔄 {} unique articles", batch.articles.len());

        self.pipeline.load(batch).await
    }
}

/// 一個攝取階段：同一資料來源下的一組病症
#[derive(Clone)]
pub struct IngestPhase {
    pub name: String,
    pub source: Arc<dyn ResearchSource>,
    pub conditions: Vec<String>,
    pub max_results: usize,
    /// 每個病症之間的等待
    pub delay: Duration,
    /// 失敗後的等待；為零時沿用 `delay`
    pub error_delay: Duration,
}

impl IngestPhase {
    /// How long to wait after a condition, if at all.
    pub fn pause_after(&self, failed: bool, more_remaining: bool) -> Option<Duration> {
        let pause = if failed && !self.error_delay.is_zero() {
            self.error_delay
        } else if more_remaining {
            self.delay
        } else {
            Duration::ZERO
        };
        (!pause.is_zero()).then_some(pause)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionResult {
    pub phase: String,
    pub condition: String,
    pub stored: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub conditions_attempted: usize,
    pub conditions_succeeded: usize,
    pub conditions_failed: usize,
    pub articles_stored: usize,
    pub duration_seconds: f64,
    pub results: Vec<ConditionResult>,
}

/// Runs ingestion phases condition by condition, sleeping between requests
/// to respect upstream rate limits. A failed condition is logged, followed by
/// the phase's error pause, and the run continues.
pub struct IngestionRunner {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    monitor: SystemMonitor,
}

impl IngestionRunner {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub async fn run(&self, phases: &[IngestPhase]) -> IngestionSummary {
        let started_at = chrono::Utc::now();
        let run_start = Instant::now();
        let mut results = Vec::new();
        self.monitor.log_stats("Ingestion started");

        for phase in phases {
            tracing::info!("🚀 Phase '{}' ({} conditions)", phase.name, phase.conditions.len());

            for (i, condition) in phase.conditions.iter().enumerate() {
                tracing::info!(
                    "[{}/{}] {}: {}",
                    i + 1,
                    phase.conditions.len(),
                    phase.source.name(),
                    condition
                );
                let start = Instant::now();
                let more_remaining = i + 1 < phase.conditions.len();

                let engine = IngestEngine::new(ResearchPipeline::new(
                    condition.clone(),
                    phase.max_results,
                    phase.source.clone(),
                    self.embedder.clone(),
                    self.store.clone(),
                ));

                match engine.run().await {
                    Ok(stored) => {
                        tracing::info!("✅ Stored {} articles for {}", stored, condition);
                        results.push(ConditionResult {
                            phase: phase.name.clone(),
                            condition: condition.clone(),
                            stored,
                            error: None,
                            duration_ms: start.elapsed().as_millis() as u64,
                        });
                        if let Some(pause) = phase.pause_after(false, more_remaining) {
                            tracing::info!("⏳ Waiting {:?} before next condition...", pause);
                            tokio::time::sleep(pause).await;
                        }
                    }
                    Err(e) => {
                        tracing::error!("❌ {} failed: {} ({:?})", condition, e, e.category());
                        tracing::error!("💡 {}", e.recovery_suggestion());
                        results.push(ConditionResult {
                            phase: phase.name.clone(),
                            condition: condition.clone(),
                            stored: 0,
                            error: Some(e.to_string()),
                            duration_ms: start.elapsed().as_millis() as u64,
                        });
                        if let Some(pause) = phase.pause_after(true, more_remaining) {
                            tracing::info!("⏳ Waiting {:?} before continuing...", pause);
                            tokio::time::sleep(pause).await;
                        }
                    }
                }
            }

            self.monitor.log_stats(&format!("Phase '{}' completed", phase.name));
        }

        let conditions_failed = results.iter().filter(|r| r.error.is_some()).count();
        let summary = IngestionSummary {
            started_at,
            finished_at: chrono::Utc::now(),
            conditions_attempted: results.len(),
            conditions_succeeded: results.len() - conditions_failed,
            conditions_failed,
            articles_stored: results.iter().map(|r| r.stored).sum(),
            duration_seconds: run_start.elapsed().as_secs_f64(),
            results,
        };
        tracing::info!(
            "📈 Ingestion complete: {} articles stored, {}/{} conditions failed",
            summary.articles_stored,
            summary.conditions_failed,
            summary.conditions_attempted
        );
        summary
    }
}

/// Write the run summary as pretty JSON through the storage port.
pub async fn write_report<S: Storage>(storage: &S, summary: &IngestionSummary) -> Result<String> {
    let filename = format!(
        "ingest_report_{}.json",
        summary.finished_at.format("%Y%m%d_%H%M%S")
    );
    let json = serde_json::to_string_pretty(summary)?;
    storage.write_file(&filename, json.as_bytes()).await?;
    Ok(filename)
}
