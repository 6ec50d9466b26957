//! Turns raw intake form text into the analyze payload.

use crate::domain::model::{AnalyzeRequest, HealingStage};
use crate::utils::error::{PromptError, Result};

/// Raw form state, exactly as typed by the clinician.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub symptoms: String,
    pub diagnosis: String,
    pub healing_stage: String,
    pub functional_limitations: String,
    pub pain_level: String,
    pub pain_with_movement: String,
    pub tenderness_to_palpation: String,
    pub constraints: String,
}

/// Split a comma separated field into trimmed, non-empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Empty input means no pain reported.
pub fn parse_pain_level(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PromptError::ValidationError {
            message: format!("Pain level must be a number, got '{}'", trimmed),
        }),
    }
}

impl IntakeForm {
    pub fn to_request(&self) -> Result<AnalyzeRequest> {
        let healing_stage =
            HealingStage::parse(&self.healing_stage).ok_or_else(|| PromptError::ValidationError {
                message: format!(
                    "Stage of healing must be acute, subacute or chronic, got '{}'",
                    self.healing_stage
                ),
            })?;

        Ok(AnalyzeRequest {
            symptoms: split_list(&self.symptoms),
            diagnosis: self.diagnosis.clone(),
            healing_stage,
            functional_limitations: split_list(&self.functional_limitations),
            pain_level: parse_pain_level(&self.pain_level)?,
            pain_with_movement: split_list(&self.pain_with_movement),
            tenderness_to_palpation: split_list(&self.tenderness_to_palpation),
            constraints: split_list(&self.constraints),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_drops_empty_segments() {
        assert_eq!(
            split_list(" pain , swelling,, ,limited range of motion ,"),
            vec!["pain", "swelling", "limited range of motion"]
        );
        assert!(split_list("").is_empty());
        assert!(split_list(" , ,").is_empty());
    }

    #[test]
    fn test_empty_pain_level_is_zero() {
        assert_eq!(parse_pain_level("").unwrap(), 0.0);
        assert_eq!(parse_pain_level("   ").unwrap(), 0.0);
        assert_eq!(parse_pain_level("7").unwrap(), 7.0);
        assert_eq!(parse_pain_level(" 4.5 ").unwrap(), 4.5);
        assert!(parse_pain_level("moderate").is_err());
        assert!(parse_pain_level("NaN").is_err());
    }

    #[test]
    fn test_form_to_request() {
        let form = IntakeForm {
            symptoms: "pain, swelling".to_string(),
            diagnosis: "Grade II lateral ankle sprain".to_string(),
            healing_stage: "subacute".to_string(),
            functional_limitations: "unable to bear weight".to_string(),
            pain_level: String::new(),
            pain_with_movement: "inversion, plantarflexion".to_string(),
            tenderness_to_palpation: "ATFL".to_string(),
            constraints: String::new(),
        };

        let request = form.to_request().unwrap();
        assert_eq!(request.symptoms, vec!["pain", "swelling"]);
        assert_eq!(request.healing_stage, HealingStage::Subacute);
        assert_eq!(request.pain_level, 0.0);
        assert_eq!(request.pain_with_movement, vec!["inversion", "plantarflexion"]);
        assert!(request.constraints.is_empty());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["pain_level"], serde_json::json!(0));
        assert_eq!(json["constraints"], serde_json::json!([]));
    }

    #[test]
    fn test_unknown_healing_stage_is_rejected() {
        let form = IntakeForm {
            healing_stage: "remodeling".to_string(),
            ..Default::default()
        };
        assert!(form.to_request().is_err());
    }
}
