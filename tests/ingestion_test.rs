use httpmock::prelude::*;
use prompt_pt::adapters::pubmed::SearchMode;
use prompt_pt::config::{AnthropicConfig, PubMedConfig, VoyageConfig};
use prompt_pt::core::ingest::{write_report, IngestPhase};
use prompt_pt::domain::model::{AnalyzeRequest, HealingStage};
use prompt_pt::{
    AnthropicClient, InMemoryVectorStore, IngestionRunner, LocalStorage, PubMedClient,
    RagPipeline, VoyageEmbedder,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const EFETCH_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">111</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><Year>2020</Year></PubDate></JournalIssue></Journal>
        <ArticleTitle>Balance training after lateral ankle sprain</ArticleTitle>
        <Abstract><AbstractText>Proprioceptive training reduced recurrence.</AbstractText></Abstract>
        <AuthorList><Author><LastName>Doe</LastName><ForeName>Jane</ForeName></Author></AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">222</PMID>
      <Article>
        <ArticleTitle>Taping for ankle instability</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

fn pubmed_config(server: &MockServer) -> PubMedConfig {
    PubMedConfig {
        search_url: server.url("/esearch.fcgi"),
        fetch_url: server.url("/efetch.fcgi"),
        timeout_seconds: 5,
        fetch_delay_ms: 0,
    }
}

#[tokio::test]
async fn test_ingest_then_answer_from_stored_evidence() {
    let server = MockServer::start_async().await;

    let search_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/esearch.fcgi")
                .query_param("term", "ankle sprain rehabilitation")
                .query_param("retmax", "8");
            then.status(200)
                .json_body(json!({"esearchresult": {"count": "2", "idlist": ["111", "222"]}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/esearch.fcgi")
                .query_param("term", "unreachable condition");
            then.status(503).body("Service Unavailable");
        })
        .await;
    let fetch_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/efetch.fcgi")
                .query_param("id", "111,222")
                .query_param("retmode", "xml");
            then.status(200).body(EFETCH_XML);
        })
        .await;
    let embed_documents_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .body_contains("\"input_type\":\"document\"");
            then.status(200).json_body(json!({
                "data": [
                    {"embedding": [1.0, 0.0], "index": 0},
                    {"embedding": [0.0, 1.0], "index": 1}
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .body_contains("\"input_type\":\"query\"");
            then.status(200)
                .json_body(json!({"data": [{"embedding": [0.9, 0.1], "index": 0}]}));
        })
        .await;
    let model_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .body_contains("Balance training after lateral ankle sprain");
            then.status(200).json_body(json!({
                "content": [{
                    "type": "text",
                    "text": "```json\n{\"differential_diagnosis\": [\"ATFL sprain\"], \"treatment_plan\": \"Balance training\", \"citations\": [{\"title\": \"Balance training after lateral ankle sprain\", \"year\": \"2020\"}]}\n```"
                }]
            }));
        })
        .await;

    let embedder = Arc::new(
        VoyageEmbedder::new(&VoyageConfig {
            api_key: "pa-test".to_string(),
            base_url: server.base_url(),
            ..Default::default()
        })
        .unwrap(),
    );
    let store = Arc::new(InMemoryVectorStore::new());
    let source = Arc::new(PubMedClient::new(&pubmed_config(&server), SearchMode::Standard).unwrap());

    let runner = IngestionRunner::new(embedder.clone(), store.clone());
    let summary = runner
        .run(&[IngestPhase {
            name: "standard".to_string(),
            source,
            conditions: vec![
                "ankle sprain rehabilitation".to_string(),
                "unreachable condition".to_string(),
            ],
            max_results: 8,
            delay: Duration::ZERO,
            error_delay: Duration::ZERO,
        }])
        .await;

    search_mock.assert_async().await;
    fetch_mock.assert_async().await;
    embed_documents_mock.assert_async().await;
    assert_eq!(summary.conditions_attempted, 2);
    assert_eq!(summary.conditions_failed, 1);
    assert_eq!(summary.articles_stored, 2);
    assert_eq!(store.count(), 2);
    assert!(store
        .query_terms()
        .iter()
        .all(|t| t.as_deref() == Some("ankle sprain rehabilitation")));

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path());
    let filename = write_report(&storage, &summary).await.unwrap();
    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join(&filename)).unwrap()).unwrap();
    assert_eq!(report["articles_stored"], 2);
    assert_eq!(report["results"][1]["condition"], "unreachable condition");

    let model = Arc::new(AnthropicClient::new(&AnthropicConfig {
        api_key: "sk-ant-test".to_string(),
        base_url: server.base_url(),
        ..Default::default()
    }));
    let pipeline = RagPipeline::new(embedder, store, model).with_match_count(1);

    let evidence = pipeline.search_similar("ankle sprain", 2).await.unwrap();
    assert_eq!(evidence[0].article.pmid, "111");
    assert_eq!(evidence[1].article.abstract_text, "No abstract available");

    let result = pipeline
        .run(&AnalyzeRequest {
            symptoms: vec!["pain".to_string()],
            diagnosis: "Lateral ankle sprain".to_string(),
            healing_stage: HealingStage::Subacute,
            functional_limitations: vec![],
            pain_level: 3.0,
            pain_with_movement: vec![],
            tenderness_to_palpation: vec![],
            constraints: vec![],
        })
        .await
        .unwrap();

    model_mock.assert_async().await;
    assert_eq!(result.differential_diagnosis, vec!["ATFL sprain"]);
    assert_eq!(result.citations[0].year, "2020");
}

#[tokio::test]
async fn test_high_quality_phase_keeps_only_complete_articles() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/esearch.fcgi")
                .query_param("sort", "relevance");
            then.status(200)
                .json_body(json!({"esearchresult": {"idlist": ["111", "222"]}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/efetch.fcgi");
            then.status(200).body(EFETCH_XML);
        })
        .await;
    let embed_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200)
                .json_body(json!({"data": [{"embedding": [1.0, 0.0], "index": 0}]}));
        })
        .await;

    let embedder = Arc::new(
        VoyageEmbedder::new(&VoyageConfig {
            api_key: "pa-test".to_string(),
            base_url: server.base_url(),
            ..Default::default()
        })
        .unwrap(),
    );
    let store = Arc::new(InMemoryVectorStore::new());
    let source =
        Arc::new(PubMedClient::new(&pubmed_config(&server), SearchMode::HighQuality).unwrap());

    let summary = IngestionRunner::new(embedder, store.clone())
        .run(&[IngestPhase {
            name: "high_quality".to_string(),
            source,
            conditions: vec!["ankle sprain rehabilitation".to_string()],
            max_results: 10,
            delay: Duration::ZERO,
            error_delay: Duration::ZERO,
        }])
        .await;

    embed_mock.assert_async().await;
    assert_eq!(summary.articles_stored, 1);
    assert_eq!(summary.conditions_failed, 0);
    assert_eq!(store.count(), 1);
}
