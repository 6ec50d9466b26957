use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stage of healing, selected from a fixed list. The empty string means the
/// clinician left the selector untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealingStage {
    Acute,
    Subacute,
    Chronic,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl HealingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealingStage::Acute => "acute",
            HealingStage::Subacute => "subacute",
            HealingStage::Chronic => "chronic",
            HealingStage::Unspecified => "",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "acute" => Some(HealingStage::Acute),
            "subacute" => Some(HealingStage::Subacute),
            "chronic" => Some(HealingStage::Chronic),
            "" => Some(HealingStage::Unspecified),
            _ => None,
        }
    }
}

impl std::fmt::Display for HealingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload posted to `/api/v1/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub healing_stage: HealingStage,
    #[serde(default)]
    pub functional_limitations: Vec<String>,
    #[serde(default, serialize_with = "serialize_number")]
    pub pain_level: f64,
    #[serde(default)]
    pub pain_with_movement: Vec<String>,
    #[serde(default)]
    pub tenderness_to_palpation: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialTest {
    pub name: String,
    #[serde(default)]
    pub procedure: String,
    #[serde(default)]
    pub positive_finding: String,
    #[serde(default)]
    pub indicates: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualTherapy {
    pub technique: String,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sets: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub reps: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(default)]
    pub source: String,
}

/// Structured clinical decision support returned by the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub differential_diagnosis: Vec<String>,
    #[serde(default)]
    pub special_tests: Vec<SpecialTest>,
    #[serde(default)]
    pub treatment_plan: String,
    #[serde(default)]
    pub manual_therapy: Vec<ManualTherapy>,
    #[serde(default)]
    pub exercise_protocol: Vec<ExerciseItem>,
    #[serde(default)]
    pub progression_criteria: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub recovery_timeline: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceLevel {
    SystematicReview,
    Rct,
    ClinicalTrial,
    Observational,
    Standard,
}

/// A research abstract as fetched from PubMed and stored for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchArticle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract", default, deserialize_with = "null_as_default")]
    pub abstract_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub year: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_level: Option<EvidenceLevel>,
}

impl ResearchArticle {
    /// Text embedded for similarity search.
    pub fn embedding_text(&self) -> String {
        format!("{}. {}", self.title, self.abstract_text)
    }
}

/// One row of the `research_documents` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub article: ResearchArticle,
    pub embedding: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_term: Option<String>,
}

/// Articles gathered for one condition, ready to embed and store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestBatch {
    pub query_term: Option<String>,
    pub articles: Vec<ResearchArticle>,
}

/// A retrieved document with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: ResearchArticle,
    #[serde(default)]
    pub similarity: f32,
}

fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Nullable database columns come back as `null` rather than missing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Models sometimes answer `"sets": 3` instead of `"sets": "3"`.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
