//! NCBI E-utilities client (esearch + efetch) producing research articles.
//!
//! Two flavours share the same plumbing: the standard search used for bulk
//! ingestion, and a high-quality search restricted to physiotherapy RCTs,
//! systematic reviews, meta-analyses and guidelines (PEDro has no public API,
//! so PubMed filters stand in for it).

use crate::adapters::ensure_success;
use crate::config::PubMedConfig;
use crate::core::evidence::classify_evidence_level;
use crate::domain::model::ResearchArticle;
use crate::domain::ports::ResearchSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const STANDARD_SOURCE: &str = "PubMed";
pub const HIGH_QUALITY_SOURCE: &str = "PubMed (High Quality)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Standard,
    HighQuality,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Fields pulled out of one `<PubmedArticle>` before any defaults apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArticle {
    pub pmid: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<String>,
}

pub fn high_quality_query(query: &str) -> String {
    format!(
        "({}) AND \
         (physical therapy[MeSH] OR physiotherapy[tiab] OR rehabilitation[MeSH]) AND \
         (systematic review[pt] OR randomized controlled trial[pt] OR \
         meta-analysis[pt] OR clinical practice guideline[pt])",
        query
    )
}

fn pubmed_url(pmid: &str) -> String {
    format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl RawArticle {
    pub fn into_standard(self) -> ResearchArticle {
        let pmid = non_empty(&self.pmid).unwrap_or_default().to_string();
        ResearchArticle {
            title: non_empty(&self.title).unwrap_or("No title").to_string(),
            abstract_text: non_empty(&self.abstract_text)
                .unwrap_or("No abstract available")
                .to_string(),
            year: non_empty(&self.year).unwrap_or("Unknown").to_string(),
            url: pubmed_url(&pmid),
            authors: self.authors,
            source: STANDARD_SOURCE.to_string(),
            evidence_level: None,
            pmid,
        }
    }

    /// Articles without a title or abstract are useless as evidence and are
    /// dropped.
    pub fn into_high_quality(self) -> Option<ResearchArticle> {
        let title = non_empty(&self.title)?.to_string();
        let abstract_text = non_empty(&self.abstract_text)?.to_string();
        let pmid = non_empty(&self.pmid).unwrap_or_default().to_string();
        let url = if pmid.is_empty() {
            String::new()
        } else {
            pubmed_url(&pmid)
        };

        Some(ResearchArticle {
            evidence_level: Some(classify_evidence_level(&title, &abstract_text)),
            pmid: format!("hq_{}", pmid),
            title,
            abstract_text,
            authors: self.authors,
            year: non_empty(&self.year).unwrap_or_default().to_string(),
            url,
            source: HIGH_QUALITY_SOURCE.to_string(),
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an efetch `PubmedArticleSet` document.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<RawArticle>> {
    let mut reader = Reader::from_str(xml);
    let mut articles = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    let mut current: Option<RawArticle> = None;
    let mut title_buf = String::new();
    let mut abstract_buf = String::new();
    let mut author: Option<(Option<String>, Option<String>)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "PubmedArticle" => {
                        current = Some(RawArticle::default());
                        title_buf.clear();
                        abstract_buf.clear();
                    }
                    "Author" if current.is_some() => author = Some((None, None)),
                    _ => {}
                }
                stack.push(name);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if let Some(article) = current.as_mut() {
                    match name.as_str() {
                        "ArticleTitle" if article.title.is_none() => {
                            article.title = Some(collapse_whitespace(&title_buf));
                        }
                        "AbstractText" if article.abstract_text.is_none() => {
                            article.abstract_text = Some(collapse_whitespace(&abstract_buf));
                        }
                        "Author" => {
                            if let Some((Some(last), fore)) = author.take() {
                                let full = match fore {
                                    Some(fore) => format!("{} {}", last, fore),
                                    None => last,
                                };
                                article.authors.push(full.trim().to_string());
                            }
                        }
                        _ => {}
                    }
                }
                if name == "PubmedArticle" {
                    if let Some(article) = current.take() {
                        articles.push(article);
                    }
                }
                stack.pop();
            }
            Event::Text(e) => {
                let Some(article) = current.as_mut() else {
                    continue;
                };
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());

                let top = stack.last().map(String::as_str);
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());

                if article.title.is_none() && stack.iter().any(|s| s == "ArticleTitle") {
                    title_buf.push_str(&text);
                } else if article.abstract_text.is_none()
                    && stack.iter().any(|s| s == "AbstractText")
                {
                    abstract_buf.push_str(&text);
                }

                match (top, parent) {
                    (Some("PMID"), _) if article.pmid.is_none() => {
                        article.pmid = Some(text.trim().to_string());
                    }
                    (Some("Year"), Some("PubDate")) if article.year.is_none() => {
                        article.year = Some(text.trim().to_string());
                    }
                    (Some("LastName"), Some("Author")) => {
                        if let Some(a) = author.as_mut() {
                            a.0 = Some(text.trim().to_string());
                        }
                    }
                    (Some("ForeName"), Some("Author")) => {
                        if let Some(a) = author.as_mut() {
                            a.1 = Some(text.trim().to_string());
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(articles)
}

pub struct PubMedClient {
    client: Client,
    search_url: String,
    fetch_url: String,
    mode: SearchMode,
    fetch_delay: Duration,
}

impl PubMedClient {
    pub fn new(config: &PubMedConfig, mode: SearchMode) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            fetch_url: config.fetch_url.clone(),
            mode,
            fetch_delay: Duration::from_millis(config.fetch_delay_ms),
        })
    }

    pub async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let retmax = max_results.to_string();
        let term = match self.mode {
            SearchMode::Standard => query.to_string(),
            SearchMode::HighQuality => high_quality_query(query),
        };

        let mut params = vec![
            ("db", "pubmed"),
            ("term", term.as_str()),
            ("retmax", retmax.as_str()),
            ("retmode", "json"),
        ];
        if self.mode == SearchMode::HighQuality {
            params.push(("sort", "relevance"));
        }

        tracing::debug!("📡 esearch: {}", term);
        let response = self.client.get(&self.search_url).query(&params).send().await?;
        let response = ensure_success("PubMed", response).await?;
        let data: SearchResponse = response.json().await?;
        Ok(data.esearchresult.idlist)
    }

    pub async fn fetch_abstracts(&self, pubmed_ids: &[String]) -> Result<Vec<ResearchArticle>> {
        if pubmed_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = pubmed_ids.join(",");
        let params = [
            ("db", "pubmed"),
            ("id", ids.as_str()),
            ("retmode", "xml"),
            ("rettype", "abstract"),
        ];

        let response = self.client.get(&self.fetch_url).query(&params).send().await?;
        let response = ensure_success("PubMed", response).await?;
        let xml = response.text().await?;

        let raw = parse_pubmed_xml(&xml)?;
        Ok(match self.mode {
            SearchMode::Standard => raw.into_iter().map(RawArticle::into_standard).collect(),
            SearchMode::HighQuality => raw
                .into_iter()
                .filter_map(RawArticle::into_high_quality)
                .collect(),
        })
    }

    async fn fetch_high_quality(&self, query: &str, max_results: usize) -> Result<Vec<ResearchArticle>> {
        let ids = self.search_ids(query, max_results).await?;
        tracing::info!("Found {} high-quality articles for: {}", ids.len(), query);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.fetch_abstracts(&ids).await
    }
}

#[async_trait]
impl ResearchSource for PubMedClient {
    fn name(&self) -> &str {
        match self.mode {
            SearchMode::Standard => STANDARD_SOURCE,
            SearchMode::HighQuality => HIGH_QUALITY_SOURCE,
        }
    }

    async fn fetch_research(&self, query: &str, max_results: usize) -> Result<Vec<ResearchArticle>> {
        match self.mode {
            SearchMode::Standard => {
                let ids = self.search_ids(query, max_results).await?;
                tracing::info!("Found {} articles", ids.len());
                let articles = self.fetch_abstracts(&ids).await?;
                tracing::info!("Fetched {} abstracts", articles.len());
                Ok(articles)
            }
            // 高品質搜尋失敗時不中斷整批攝取
            SearchMode::HighQuality => match self.fetch_high_quality(query, max_results).await {
                Ok(articles) => {
                    tracing::info!("Fetched {} high-quality articles", articles.len());
                    Ok(articles)
                }
                Err(e) => {
                    tracing::warn!("⚠️ High-quality search error: {}", e);
                    Ok(Vec::new())
                }
            },
        }
    }
}
