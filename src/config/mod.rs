#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{PromptError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_required_secret,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ANALYZE_ENDPOINT: &str = "http://localhost:8000/api/v1/analyze";

/// 整個服務與攝取工具共用的設定，所有區段皆可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub anthropic: AnthropicConfig,
    pub voyage: VoyageConfig,
    pub vector_store: VectorStoreConfig,
    pub supabase: SupabaseConfig,
    pub retrieval: RetrievalConfig,
    pub pubmed: PubMedConfig,
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub allowed_origins: Vec<String>,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-opus-4-5".to_string(),
            max_tokens: 4096,
            api_version: "2023-06-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoyageConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for VoyageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.voyageai.com".to_string(),
            model: "voyage-large-2".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Supabase,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub table: String,
    pub match_function: String,
    /// 表格有 `query_term` / `evidence_level` 欄位時才寫入
    pub metadata_columns: bool,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            table: "research_documents".to_string(),
            match_function: "match_research_documents".to_string(),
            metadata_columns: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub match_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_count: crate::core::rag::DEFAULT_MATCH_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
    pub search_url: String,
    pub fetch_url: String,
    pub timeout_seconds: u64,
    /// 高品質搜尋在 esearch 與 efetch 之間的停頓
    pub fetch_delay_ms: u64,
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            search_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi".to_string(),
            fetch_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi".to_string(),
            timeout_seconds: 15,
            fetch_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_results: usize,
    pub high_quality_max_results: usize,
    pub condition_delay_seconds: u64,
    pub high_quality_delay_seconds: u64,
    pub error_delay_seconds: u64,
    pub conditions: Vec<String>,
    pub high_quality_conditions: Vec<String>,
}

const DEFAULT_CONDITIONS: &[&str] = &[
    "ACL reconstruction rehabilitation physical therapy",
    "rotator cuff tear physical therapy treatment",
    "lateral ankle sprain rehabilitation",
    "patellofemoral pain syndrome exercise treatment",
    "lumbar disc herniation physical therapy",
    "shoulder impingement syndrome rehabilitation",
    "Achilles tendinopathy exercise treatment",
    "knee osteoarthritis physical therapy",
    "plantar fasciitis treatment rehabilitation",
    "cervical radiculopathy physical therapy",
    "hip labral tear rehabilitation",
    "tennis elbow lateral epicondylitis treatment",
    "frozen shoulder adhesive capsulitis treatment",
    "meniscus tear rehabilitation physical therapy",
    "carpal tunnel syndrome physical therapy",
    "IT band syndrome rehabilitation running",
    "hamstring strain rehabilitation return to sport",
    "low back pain exercise therapy treatment",
    "biceps tendinopathy rehabilitation",
    "tibial stress fracture rehabilitation",
];

const DEFAULT_HIGH_QUALITY_CONDITIONS: &[&str] = &[
    "ACL reconstruction rehabilitation",
    "rotator cuff rehabilitation",
    "low back pain exercise therapy",
    "knee osteoarthritis physiotherapy",
    "shoulder impingement physiotherapy",
    "patellofemoral pain physiotherapy",
    "Achilles tendinopathy exercise",
    "ankle sprain rehabilitation",
    "plantar fasciitis physiotherapy",
    "cervical radiculopathy physiotherapy",
];

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_results: 8,
            high_quality_max_results: 10,
            condition_delay_seconds: 25,
            high_quality_delay_seconds: 5,
            error_delay_seconds: 60,
            conditions: DEFAULT_CONDITIONS.iter().map(|s| s.to_string()).collect(),
            high_quality_conditions: DEFAULT_HIGH_QUALITY_CONDITIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PromptError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: AppConfig =
            toml::from_str(&processed_content).map_err(|e| PromptError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Load `path` if it exists, otherwise defaults plus environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) if Path::new(path).exists() => {
                tracing::info!("📁 Loading configuration from: {}", path);
                Self::from_file(path)
            }
            Some(path) => {
                tracing::warn!("⚠️ Config file '{}' not found, using defaults and environment", path);
                Ok(Self::from_env())
            }
            None => Ok(Self::from_env()),
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_fallbacks();
        config
    }

    /// 替換環境變數 (例如 ${ANTHROPIC_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PromptError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Secrets left empty in the file are read from the usual variables.
    fn apply_env_fallbacks(&mut self) {
        fill_from_env(&mut self.anthropic.api_key, "ANTHROPIC_API_KEY");
        fill_from_env(&mut self.voyage.api_key, "VOYAGE_API_KEY");
        fill_from_env(&mut self.supabase.url, "SUPABASE_URL");
        fill_from_env(&mut self.supabase.key, "SUPABASE_KEY");
    }

    /// Settings needed to answer analyze requests.
    pub fn validate_analysis(&self) -> Result<()> {
        validate_url("anthropic.base_url", &self.anthropic.base_url)?;
        validate_required_secret("anthropic.api_key", &self.anthropic.api_key)?;
        validate_positive_number("retrieval.match_count", self.retrieval.match_count, 1)?;
        self.validate_embedding_and_store()
    }

    /// Settings needed to ingest research.
    pub fn validate_ingestion(&self) -> Result<()> {
        validate_url("pubmed.search_url", &self.pubmed.search_url)?;
        validate_url("pubmed.fetch_url", &self.pubmed.fetch_url)?;
        validate_range("pubmed.timeout_seconds", self.pubmed.timeout_seconds, 1, 300)?;
        validate_positive_number("ingestion.max_results", self.ingestion.max_results, 1)?;
        validate_positive_number(
            "ingestion.high_quality_max_results",
            self.ingestion.high_quality_max_results,
            1,
        )?;
        self.validate_embedding_and_store()
    }

    fn validate_embedding_and_store(&self) -> Result<()> {
        validate_url("voyage.base_url", &self.voyage.base_url)?;
        validate_required_secret("voyage.api_key", &self.voyage.api_key)?;
        validate_range("voyage.timeout_seconds", self.voyage.timeout_seconds, 1, 300)?;
        if self.vector_store.backend == VectorBackend::Supabase {
            validate_url("supabase.url", &self.supabase.url)?;
            validate_required_secret("supabase.key", &self.supabase.key)?;
            validate_non_empty_string("supabase.table", &self.supabase.table)?;
            validate_non_empty_string("supabase.match_function", &self.supabase.match_function)?;
        }
        Ok(())
    }
}

fn fill_from_env(field: &mut String, var: &str) {
    let unresolved = field.starts_with("${") && field.ends_with('}');
    if field.trim().is_empty() || unresolved {
        if let Ok(value) = std::env::var(var) {
            *field = value;
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("server.bind_address", &self.bind_address)?;
        self.bind_address
            .parse::<std::net::SocketAddr>()
            .map_err(|e| PromptError::InvalidConfigValueError {
                field: "server.bind_address".to_string(),
                value: self.bind_address.clone(),
                reason: e.to_string(),
            })?;
        for origin in &self.allowed_origins {
            validate_url("server.allowed_origins", origin)?;
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.validate_analysis()
    }
}
