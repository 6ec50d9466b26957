//! Retrieval query, grounded prompt and model-response parsing for the
//! analysis pipeline.

use crate::domain::model::{AnalysisResult, AnalyzeRequest, HealingStage, ScoredArticle};
use crate::utils::error::{PromptError, Result};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

const RESPONSE_SCHEMA: &str = r#"{
  "differential_diagnosis": ["most likely diagnosis", "next most likely diagnosis"],
  "special_tests": [
    {
      "name": "test name",
      "procedure": "how to perform the test",
      "positive_finding": "what a positive result looks like",
      "indicates": "what a positive result suggests"
    }
  ],
  "treatment_plan": "detailed narrative treatment plan with evidence references like [1]",
  "manual_therapy": [
    {
      "technique": "technique name",
      "target": "target tissue or joint",
      "rationale": "why it is indicated"
    }
  ],
  "exercise_protocol": [
    {
      "name": "exercise name",
      "description": "how to perform it",
      "sets": "number of sets",
      "reps": "number of reps",
      "frequency": "how often",
      "notes": "any special notes"
    }
  ],
  "progression_criteria": ["criterion 1", "criterion 2"],
  "contraindications": ["contraindication 1", "contraindication 2"],
  "recovery_timeline": "expected recovery timeline narrative",
  "citations": [
    {
      "title": "article title",
      "authors": ["author1", "author2"],
      "year": "year",
      "url": "pubmed url",
      "source": "PubMed"
    }
  ]
}"#;

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

/// Build the similarity-search query for an assessment.
pub fn build_query(request: &AnalyzeRequest) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !request.diagnosis.trim().is_empty() {
        parts.push(request.diagnosis.trim().to_string());
    }
    if request.healing_stage != HealingStage::Unspecified {
        parts.push(format!("{} stage", request.healing_stage));
    }
    parts.push("rehabilitation".to_string());
    parts.extend(request.symptoms.iter().cloned());
    parts.join(" ")
}

pub fn build_prompt(request: &AnalyzeRequest, evidence: &[ScoredArticle]) -> String {
    let mut evidence_text = String::new();
    for (i, doc) in evidence.iter().enumerate() {
        let article = &doc.article;
        let authors = if article.authors.is_empty() {
            "Unknown".to_string()
        } else {
            article.authors.join(", ")
        };
        // 寫入 String 不會失敗
        let _ = write!(
            evidence_text,
            "\n[{}] Title: {}\nAuthors: {}\nYear: {}\nURL: {}\nAbstract: {}\n---\n",
            i + 1,
            article.title,
            authors,
            article.year,
            article.url,
            article.abstract_text
        );
    }

    let stage = if request.healing_stage == HealingStage::Unspecified {
        "Not specified"
    } else {
        request.healing_stage.as_str()
    };

    format!(
        "You are an expert Physical Therapy clinical decision support AI.
You must ONLY make recommendations that are directly supported by the provided research evidence.
You must NEVER hallucinate or invent medical recommendations without citation.

PATIENT ASSESSMENT:
- Diagnosis: {diagnosis}
- Symptoms: {symptoms}
- Pain with Movement: {pain_with_movement}
- Tenderness to Palpation: {tenderness}
- Stage of Healing: {stage}
- Functional Limitations: {limitations}
- Pain Level: {pain}/10
- Constraints: {constraints}

RETRIEVED EVIDENCE:
{evidence_text}

Based ONLY on the evidence above, generate structured clinical decision support in the following JSON format.
Rank the differential diagnosis from most to least likely and list at most six candidates.
{schema}

Respond with valid JSON only. No additional text. No markdown. No code fences.
",
        diagnosis = request.diagnosis,
        symptoms = join_or(&request.symptoms, "None reported"),
        pain_with_movement = join_or(&request.pain_with_movement, "None reported"),
        tenderness = join_or(&request.tenderness_to_palpation, "None reported"),
        stage = stage,
        limitations = join_or(&request.functional_limitations, "None reported"),
        pain = request.pain_level,
        constraints = join_or(&request.constraints, "None"),
        evidence_text = evidence_text,
        schema = RESPONSE_SCHEMA,
    )
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("fence pattern is valid")
    })
}

/// Strip markdown code fences the model may wrap around its JSON.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(caps) = fence_regex().captures(trimmed) {
        if let Some(inner) = caps.get(1) {
            return inner.as_str().trim();
        }
    }
    trimmed
}

pub fn parse_model_response(text: &str) -> Result<AnalysisResult> {
    let clean = strip_code_fences(text);

    match serde_json::from_str::<AnalysisResult>(clean) {
        Ok(result) => Ok(result),
        Err(first_error) => {
            // 模型偶爾在 JSON 前後加上說明文字，退而擷取最外層物件
            let (Some(start), Some(end)) = (clean.find('{'), clean.rfind('}')) else {
                return Err(PromptError::ModelResponseError {
                    message: format!("no JSON object in response: {}", first_error),
                });
            };
            if end < start {
                return Err(PromptError::ModelResponseError {
                    message: format!("no JSON object in response: {}", first_error),
                });
            }
            serde_json::from_str::<AnalysisResult>(&clean[start..=end]).map_err(|e| {
                PromptError::ModelResponseError {
                    message: e.to_string(),
                }
            })
        }
    }
}
