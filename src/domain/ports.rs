use crate::domain::model::{
    AnalysisResult, AnalyzeRequest, IngestBatch, ResearchArticle, ScoredArticle, StoredDocument,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 報告等輸出檔案的寫入端
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Anything that turns a clinical assessment into decision support: the
/// remote endpoint for the intake client, the RAG pipeline for the server.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn insert(&self, document: &StoredDocument) -> Result<()>;
    async fn search(&self, query_embedding: &[f32], match_count: usize)
        -> Result<Vec<ScoredArticle>>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait ResearchSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_research(&self, query: &str, max_results: usize)
        -> Result<Vec<ResearchArticle>>;
}

/// 研究攝取的 ETL 三階段
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ResearchArticle>>;
    async fn transform(&self, data: Vec<ResearchArticle>) -> Result<IngestBatch>;
    async fn load(&self, batch: IngestBatch) -> Result<usize>;
}
