//! Plain-text rendering of an analysis result, one block per section.

use crate::domain::model::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub items: Vec<String>,
}

/// Differential diagnoses are lettered; past Z we fall back to numbers.
fn diagnosis_label(index: usize) -> String {
    if index < 26 {
        ((b'A' + index as u8) as char).to_string()
    } else {
        (index + 1).to_string()
    }
}

fn paragraph(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

pub fn sections(result: &AnalysisResult) -> Vec<Section> {
    vec![
        Section {
            title: "Differential Diagnosis",
            items: result
                .differential_diagnosis
                .iter()
                .enumerate()
                .map(|(i, d)| format!("{}. {}", diagnosis_label(i), d))
                .collect(),
        },
        Section {
            title: "Recommended Special Tests",
            items: result
                .special_tests
                .iter()
                .map(|t| {
                    format!(
                        "{}\n   Procedure: {}\n   Positive finding: {}\n   Indicates: {}",
                        t.name, t.procedure, t.positive_finding, t.indicates
                    )
                })
                .collect(),
        },
        Section {
            title: "Treatment Plan",
            items: paragraph(&result.treatment_plan),
        },
        Section {
            title: "Manual Therapy",
            items: result
                .manual_therapy
                .iter()
                .map(|m| {
                    let mut item = format!("{}\n   Target: {}", m.technique, m.target);
                    if let Some(rationale) = m.rationale.as_deref().filter(|r| !r.is_empty()) {
                        item.push_str(&format!("\n   {}", rationale));
                    }
                    item
                })
                .collect(),
        },
        Section {
            title: "Exercise Protocol",
            items: result
                .exercise_protocol
                .iter()
                .map(|ex| {
                    let mut item = ex.name.clone();
                    if let Some(description) = ex.description.as_deref().filter(|d| !d.is_empty()) {
                        item.push_str(&format!("\n   {}", description));
                    }
                    item.push_str(&format!(
                        "\n   {} sets x {} - {}",
                        ex.sets, ex.reps, ex.frequency
                    ));
                    if let Some(notes) = ex.notes.as_deref().filter(|n| !n.is_empty()) {
                        item.push_str(&format!("\n   Note: {}", notes));
                    }
                    item
                })
                .collect(),
        },
        Section {
            title: "Progression Criteria",
            items: result
                .progression_criteria
                .iter()
                .map(|c| format!("• {}", c))
                .collect(),
        },
        Section {
            title: "Contraindications",
            items: result
                .contraindications
                .iter()
                .map(|c| format!("• {}", c))
                .collect(),
        },
        Section {
            title: "Recovery Timeline",
            items: paragraph(&result.recovery_timeline),
        },
        Section {
            title: "Evidence Citations",
            items: result
                .citations
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let authors = c
                        .authors
                        .as_ref()
                        .map(|a| a.join(", "))
                        .unwrap_or_default();
                    format!(
                        "[{}] {}\n    {}\n    {} - {} - {}",
                        i + 1,
                        c.title,
                        c.url,
                        authors,
                        c.year,
                        c.source
                    )
                })
                .collect(),
        },
    ]
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::from("🩺 Clinical Decision Support\n");
    for section in sections(result) {
        out.push('\n');
        out.push_str(&format!("== {} ==\n", section.title));
        for item in &section.items {
            out.push_str(item);
            out.push('\n');
        }
    }
    out
}
