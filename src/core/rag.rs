use crate::core::prompt::{build_prompt, build_query, parse_model_response};
use crate::domain::model::{AnalysisResult, AnalyzeRequest, ScoredArticle};
use crate::domain::ports::{AnalysisService, Embedder, LanguageModel, VectorStore};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_MATCH_COUNT: usize = 5;

/// 檢索增強生成：查詢向量庫取得研究證據，再交給語言模型產生治療建議
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn LanguageModel>,
    match_count: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            embedder,
            store,
            model,
            match_count: DEFAULT_MATCH_COUNT,
        }
    }

    pub fn with_match_count(mut self, match_count: usize) -> Self {
        self.match_count = match_count;
        self
    }

    /// Embed the query and return the closest stored documents.
    pub async fn search_similar(&self, query: &str, match_count: usize) -> Result<Vec<ScoredArticle>> {
        let embedding = self.embedder.embed_query(query).await?;
        self.store.search(&embedding, match_count).await
    }

    pub async fn run(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        let query = build_query(request);
        tracing::info!("🔍 Searching for evidence: {}", query);
        let evidence = self.search_similar(&query, self.match_count).await?;
        tracing::info!("📚 Retrieved {} evidence documents", evidence.len());

        let prompt = build_prompt(request, &evidence);
        tracing::debug!("Prompt length: {} chars", prompt.len());

        let response_text = self.model.complete(&prompt).await?;
        let preview: String = response_text.chars().take(200).collect();
        tracing::debug!("Raw response preview: {}", preview);

        parse_model_response(&response_text)
    }
}

#[async_trait]
impl AnalysisService for RagPipeline {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult> {
        self.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryVectorStore;
    use crate::domain::model::{HealingStage, ResearchArticle, StoredDocument};
    use crate::utils::error::PromptError;
    use std::sync::Mutex;

    /// 以關鍵字決定向量，讓相似度可預期
    struct KeywordEmbedder;

    fn keyword_vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        vec![
            if text.contains("knee") { 1.0 } else { 0.0 },
            if text.contains("shoulder") { 1.0 } else { 0.0 },
            0.1,
        ]
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }

        async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
            Ok(keyword_vector(query))
        }
    }

    struct RecordingModel {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    fn stored(title: &str) -> StoredDocument {
        StoredDocument {
            article: ResearchArticle {
                pmid: title.to_string(),
                title: title.to_string(),
                abstract_text: "Abstract".to_string(),
                authors: vec![],
                year: "2022".to_string(),
                url: String::new(),
                source: "PubMed".to_string(),
                evidence_level: None,
            },
            embedding: keyword_vector(title),
            query_term: None,
        }
    }

    fn knee_request() -> AnalyzeRequest {
        AnalyzeRequest {
            symptoms: vec!["knee pain".to_string()],
            diagnosis: "Patellofemoral pain".to_string(),
            healing_stage: HealingStage::Chronic,
            functional_limitations: vec![],
            pain_level: 3.0,
            pain_with_movement: vec![],
            tenderness_to_palpation: vec![],
            constraints: vec![],
        }
    }

    #[tokio::test]
    async fn test_run_grounds_prompt_in_closest_documents() {
        let store = Arc::new(InMemoryVectorStore::new());
        store.insert(&stored("Knee strengthening trial")).await.unwrap();
        store.insert(&stored("Shoulder mobility review")).await.unwrap();

        let model = Arc::new(RecordingModel {
            response: "```json\n{\"differential_diagnosis\": [\"PFPS\"], \"treatment_plan\": \"Hip and knee strengthening [1]\"}\n```".to_string(),
            prompts: Mutex::new(Vec::new()),
        });

        let pipeline = RagPipeline::new(Arc::new(KeywordEmbedder), store, model.clone())
            .with_match_count(1);

        let result = pipeline.analyze(&knee_request()).await.unwrap();

        assert_eq!(result.differential_diagnosis, vec!["PFPS"]);
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[1] Title: Knee strengthening trial"));
        assert!(!prompts[0].contains("Shoulder mobility review"));
    }

    #[tokio::test]
    async fn test_unparseable_model_output_is_an_error() {
        let model = Arc::new(RecordingModel {
            response: "Sorry, no plan.".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let pipeline = RagPipeline::new(
            Arc::new(KeywordEmbedder),
            Arc::new(InMemoryVectorStore::new()),
            model,
        );

        let err = pipeline.run(&knee_request()).await.unwrap_err();
        assert!(matches!(err, PromptError::ModelResponseError { .. }));
    }
}
