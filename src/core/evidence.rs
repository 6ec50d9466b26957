use crate::domain::model::EvidenceLevel;

// 依優先順序檢查，越前面的研究類型證據等級越高
const LEVEL_KEYWORDS: &[(EvidenceLevel, &[&str])] = &[
    (
        EvidenceLevel::SystematicReview,
        &["systematic review", "meta-analysis", "cochrane"],
    ),
    (
        EvidenceLevel::Rct,
        &[
            "randomized controlled",
            "randomised controlled",
            "rct",
            "randomized trial",
        ],
    ),
    (
        EvidenceLevel::ClinicalTrial,
        &["clinical trial", "controlled trial"],
    ),
    (
        EvidenceLevel::Observational,
        &["cohort study", "case control", "observational"],
    ),
];

/// Classify a study by the keywords in its title and abstract.
pub fn classify_evidence_level(title: &str, abstract_text: &str) -> EvidenceLevel {
    let text = format!("{} {}", title, abstract_text).to_lowercase();

    LEVEL_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(level, _)| *level)
        .unwrap_or(EvidenceLevel::Standard)
}
