//! The single live symptom-checking session

use chrono::{DateTime, Utc};
use idms_shared::{IdmsResult, RecordId, ValidationErrorCode, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::analysis::AnalysisResponse;

/// Optional demographics sent along with an analysis
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub location: Option<String>,
    pub age_range: Option<String>,
    pub gender: Option<String>,
}

/// Snapshot of what the session holds
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentSymptoms {
    pub selected: Vec<String>,
    pub custom: Vec<String>,
    pub all: Vec<String>,
}

/// Symptoms collected so far, plus the last analysis the backend returned.
///
/// Selected keys and custom entries are each free of duplicates; the two sets
/// are not deduplicated against each other.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SymptomSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub user_info: UserInfo,
    selected: Vec<String>,
    custom: Vec<String>,
    analysis: Option<AnalysisResponse>,
}

impl SymptomSession {
    pub fn new(user_info: UserInfo, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("session_{}", Uuid::new_v4().simple()),
            started_at: now,
            user_info,
            selected: Vec::new(),
            custom: Vec::new(),
            analysis: None,
        }
    }

    /// Add a vocabulary key; a repeat is ignored. Returns the selected keys.
    pub fn add_symptom(&mut self, symptom: &str) -> &[String] {
        if !self.selected.iter().any(|s| s == symptom) {
            self.selected.push(symptom.to_string());
        }
        &self.selected
    }

    pub fn remove_symptom(&mut self, symptom: &str) -> &[String] {
        self.selected.retain(|s| s != symptom);
        &self.selected
    }

    /// Add free text, trimmed and lower-cased. Blank input is ignored.
    pub fn add_custom_symptom(&mut self, symptom: &str) -> &[String] {
        let symptom = symptom.trim().to_lowercase();
        if !symptom.is_empty() && !self.custom.contains(&symptom) {
            self.custom.push(symptom);
        }
        &self.custom
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn custom(&self) -> &[String] {
        &self.custom
    }

    /// Selected keys then custom entries
    pub fn all_symptoms(&self) -> Vec<String> {
        self.selected.iter().chain(self.custom.iter()).cloned().collect()
    }

    pub fn current_symptoms(&self) -> CurrentSymptoms {
        CurrentSymptoms {
            selected: self.selected.clone(),
            custom: self.custom.clone(),
            all: self.all_symptoms(),
        }
    }

    pub fn total_symptoms(&self) -> usize {
        self.selected.len() + self.custom.len()
    }

    /// At least one selected symptom, and no more than `max_symptoms` in total
    pub fn validate_for_analysis(&self, max_symptoms: usize) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.selected.is_empty() {
            result.add_error(
                "selected_symptoms",
                "Please select at least one symptom",
                ValidationErrorCode::Required,
            );
        }
        if self.total_symptoms() > max_symptoms {
            result.add_error(
                "selected_symptoms",
                &format!(
                    "Please select no more than {} symptoms for accurate analysis",
                    max_symptoms
                ),
                ValidationErrorCode::TooMany,
            );
        }
        result
    }

    /// Request body for the analysis endpoint; validates first
    pub fn analysis_payload(&self, max_symptoms: usize) -> IdmsResult<Value> {
        self.validate_for_analysis(max_symptoms).into_result()?;
        Ok(json!({
            "selected_symptoms": self.selected,
            "custom_symptoms": self.custom,
            "location": self.user_info.location.clone().unwrap_or_default(),
            "age_range": self.user_info.age_range.clone().unwrap_or_default(),
            "gender": self.user_info.gender.clone().unwrap_or_default(),
        }))
    }

    /// Replace the previous analysis, if any
    pub fn record_analysis(&mut self, response: AnalysisResponse) {
        self.analysis = Some(response);
    }

    pub fn analysis(&self) -> Option<&AnalysisResponse> {
        self.analysis.as_ref()
    }

    /// Backend id of the last analysis, needed to escalate to an emergency
    pub fn server_session_id(&self) -> Option<&RecordId> {
        self.analysis.as_ref().and_then(|a| a.session_id.as_ref())
    }
}
