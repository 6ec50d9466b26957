use crate::config::SupabaseConfig;
use crate::domain::model::{ScoredArticle, StoredDocument};
use crate::domain::ports::VectorStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

/// 基本表格沒有的欄位
const METADATA_COLUMNS: [&str; 2] = ["query_term", "evidence_level"];

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
}

/// pgvector 表格，透過 PostgREST 寫入並以 RPC 做相似度查詢
pub struct SupabaseVectorStore {
    client: Client,
    table_url: String,
    rpc_url: String,
    key: String,
    metadata_columns: bool,
}

impl SupabaseVectorStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        let base = config.url.trim_end_matches('/');
        Self {
            client: Client::new(),
            table_url: format!("{}/rest/v1/{}", base, config.table),
            rpc_url: format!("{}/rest/v1/rpc/{}", base, config.match_function),
            key: config.key.clone(),
            metadata_columns: config.metadata_columns,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Content-Type", "application/json")
    }

    fn insert_row(&self, document: &StoredDocument) -> Result<Value> {
        let mut row = serde_json::to_value(document)?;
        if !self.metadata_columns {
            if let Some(columns) = row.as_object_mut() {
                for column in METADATA_COLUMNS {
                    columns.remove(column);
                }
            }
        }
        Ok(row)
    }
}

#[async_trait]
impl VectorStore for SupabaseVectorStore {
    async fn insert(&self, document: &StoredDocument) -> Result<()> {
        let row = self.insert_row(document)?;
        let request = self
            .authorized(self.client.post(&self.table_url))
            .header("Prefer", "return=minimal")
            .json(&row);

        let response = request.send().await?;
        super::ensure_success("Supabase", response).await?;
        tracing::debug!("Stored PMID {}", document.article.pmid);
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], match_count: usize) -> Result<Vec<ScoredArticle>> {
        let body = MatchRequest {
            query_embedding,
            match_count,
        };

        let response = self
            .authorized(self.client.post(&self.rpc_url))
            .json(&body)
            .send()
            .await?;
        let response = super::ensure_success("Supabase", response).await?;
        let rows: Vec<ScoredArticle> = response.json().await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EvidenceLevel, ResearchArticle};
    use crate::utils::error::PromptError;
    use httpmock::prelude::*;
    use serde_json::json;

    fn store(url: String) -> SupabaseVectorStore {
        SupabaseVectorStore::new(&SupabaseConfig {
            url,
            key: "service-key".to_string(),
            ..Default::default()
        })
    }

    fn document(evidence_level: Option<EvidenceLevel>) -> StoredDocument {
        StoredDocument {
            article: ResearchArticle {
                pmid: "123".to_string(),
                title: "Ankle rehab".to_string(),
                abstract_text: "Balance training works.".to_string(),
                authors: vec!["Doe J".to_string()],
                year: "2020".to_string(),
                url: "https://pubmed.ncbi.nlm.nih.gov/123/".to_string(),
                source: "PubMed".to_string(),
                evidence_level,
            },
            embedding: vec![0.25, 0.75],
            query_term: Some("ankle sprain".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_posts_row_with_auth_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/research_documents")
                    .header("apikey", "service-key")
                    .header("authorization", "Bearer service-key")
                    .json_body(json!({
                        "pmid": "123",
                        "title": "Ankle rehab",
                        "abstract": "Balance training works.",
                        "authors": ["Doe J"],
                        "year": "2020",
                        "url": "https://pubmed.ncbi.nlm.nih.gov/123/",
                        "source": "PubMed",
                        "embedding": [0.25, 0.75]
                    }));
                then.status(201);
            })
            .await;

        // 預設表格只有基本欄位
        store(server.base_url())
            .insert(&document(Some(EvidenceLevel::SystematicReview)))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insert_with_metadata_columns() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/research_documents")
                    .json_body_partial(
                        r#"{"query_term": "ankle sprain", "evidence_level": "systematic_review"}"#,
                    );
                then.status(201);
            })
            .await;

        let store = SupabaseVectorStore::new(&SupabaseConfig {
            url: server.base_url(),
            key: "service-key".to_string(),
            metadata_columns: true,
            ..Default::default()
        });
        store
            .insert(&document(Some(EvidenceLevel::SystematicReview)))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_calls_match_function() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/rpc/match_research_documents")
                    .json_body(json!({"query_embedding": [1.0, 0.0], "match_count": 2}));
                then.status(200).json_body(json!([
                    {
                        "id": 7,
                        "pmid": "123",
                        "title": "Ankle rehab",
                        "abstract": "Balance training works.",
                        "authors": ["Doe J"],
                        "year": "2020",
                        "url": "https://pubmed.ncbi.nlm.nih.gov/123/",
                        "source": "PubMed",
                        "similarity": 0.91
                    }
                ]));
            })
            .await;

        let results = store(server.base_url()).search(&[1.0, 0.0], 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].article.title, "Ankle rehab");
        assert!((results[0].similarity - 0.91).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rejected_insert_is_upstream_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/research_documents");
                then.status(401).json_body(json!({"message": "Invalid API key"}));
            })
            .await;

        let document = StoredDocument {
            article: ResearchArticle {
                pmid: "1".to_string(),
                title: "t".to_string(),
                abstract_text: "a".to_string(),
                authors: vec![],
                year: String::new(),
                url: String::new(),
                source: "PubMed".to_string(),
                evidence_level: None,
            },
            embedding: vec![1.0],
            query_term: None,
        };

        let err = store(server.base_url()).insert(&document).await.unwrap_err();
        assert!(matches!(err, PromptError::UpstreamStatusError { status: 401, .. }));
    }
}
