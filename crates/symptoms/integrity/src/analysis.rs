//! Backend analysis payloads and the results the checker presents

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use idms_shared::RecordId;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assessment::{
    detect_emergency_symptoms, generate_recommendations, urgency_text, Recommendations, RiskLevel, SeverityLevel,
};
use crate::session::SymptomSession;

const DEFAULT_QUICK_RECOMMENDATION: &str = "Please consult a healthcare provider.";
const UNKNOWN_DISEASE: &str = "Unknown";

/// Per-disease score as the backend reports it
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiseaseAnalysis {
    pub disease: Option<RecordId>,
    pub disease_name: String,
    pub disease_type: Option<String>,
    pub probability_percentage: f64,
    pub severity_assessment: Option<String>,
    pub calculated_score: f64,
}

/// Body of a full analysis response
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisResponse {
    pub session_id: Option<RecordId>,
    pub overall_risk_score: Option<f64>,
    #[serde(deserialize_with = "known")]
    pub severity_level: Option<SeverityLevel>,
    #[serde(deserialize_with = "text")]
    pub primary_suspected_disease: Option<String>,
    pub emergency_recommended: bool,
    pub nearest_clinic_recommended: bool,
    pub needs_followup: bool,
    pub followup_date: Option<String>,
    pub disease_analyses: Vec<DiseaseAnalysis>,
    pub recommendation: Option<String>,
    pub prevention_tips: Vec<Value>,
}

/// Body of a quick check response
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuickCheckResponse {
    pub symptoms_analyzed: Vec<String>,
    pub overall_risk_score: Option<f64>,
    pub emergency_recommended: bool,
    pub disease_analyses: Vec<DiseaseAnalysis>,
    pub recommendation: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiseaseScore {
    pub id: Option<RecordId>,
    pub name: String,
    pub disease_type: Option<String>,
    pub probability: f64,
    pub severity: Option<String>,
    pub score: f64,
}

impl From<&DiseaseAnalysis> for DiseaseScore {
    fn from(analysis: &DiseaseAnalysis) -> Self {
        Self {
            id: analysis.disease.clone(),
            name: analysis.disease_name.clone(),
            disease_type: analysis.disease_type.clone(),
            probability: analysis.probability_percentage,
            severity: analysis.severity_assessment.clone(),
            score: analysis.calculated_score,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
    pub overall_risk_score: f64,
    pub severity_level: Option<SeverityLevel>,
    pub primary_disease: Option<String>,
    pub emergency_recommended: bool,
    pub clinic_visit_recommended: bool,
    pub follow_up_needed: bool,
    pub follow_up_date: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub urgency: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub session_id: Option<RecordId>,
    pub summary: AnalysisSummary,
    /// Highest probability first
    pub diseases: Vec<DiseaseScore>,
    pub immediate_advice: Option<String>,
    pub prevention_tips: Vec<Value>,
    pub risk_assessment: RiskAssessment,
    pub recommendations: Recommendations,
}

impl AnalysisResult {
    /// Present a backend response. `symptoms` is re-checked locally so an
    /// emergency is flagged even when the backend did not flag it.
    pub fn from_response<S: AsRef<str>>(response: &AnalysisResponse, symptoms: &[S]) -> Self {
        let emergency_recommended =
            response.emergency_recommended || detect_emergency_symptoms(symptoms).has_emergency_symptoms;
        let score = response.overall_risk_score.unwrap_or(0.0);

        Self {
            session_id: response.session_id.clone(),
            summary: AnalysisSummary {
                overall_risk_score: score,
                severity_level: response.severity_level,
                primary_disease: response.primary_suspected_disease.clone(),
                emergency_recommended,
                clinic_visit_recommended: response.nearest_clinic_recommended,
                follow_up_needed: response.needs_followup,
                follow_up_date: response.followup_date.clone(),
            },
            diseases: ranked(&response.disease_analyses),
            immediate_advice: response.recommendation.clone(),
            prevention_tips: response.prevention_tips.clone(),
            risk_assessment: RiskAssessment {
                level: RiskLevel::from_score(score),
                urgency: urgency_text(response.severity_level).to_string(),
            },
            recommendations: generate_recommendations(response.severity_level, emergency_recommended),
        }
    }
}

fn ranked(analyses: &[DiseaseAnalysis]) -> Vec<DiseaseScore> {
    let mut diseases: Vec<DiseaseScore> = analyses.iter().map(DiseaseScore::from).collect();
    diseases.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    diseases
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuickCheckSummary {
    pub total_symptoms: usize,
    pub risk_level: RiskLevel,
    pub emergency_recommended: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuickCheckResult {
    pub summary: QuickCheckSummary,
    pub diseases: Vec<DiseaseScore>,
    pub recommendation: String,
}

impl QuickCheckResult {
    pub fn from_response<S: AsRef<str>>(response: &QuickCheckResponse, symptoms: &[S]) -> Self {
        Self {
            summary: QuickCheckSummary {
                total_symptoms: response.symptoms_analyzed.len(),
                risk_level: RiskLevel::from_score(response.overall_risk_score.unwrap_or(0.0)),
                emergency_recommended: response.emergency_recommended
                    || detect_emergency_symptoms(symptoms).has_emergency_symptoms,
            },
            diseases: ranked(&response.disease_analyses),
            recommendation: response
                .recommendation
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_QUICK_RECOMMENDATION.to_string()),
        }
    }
}

/// One completed analysis in the history list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub date: DateTime<Utc>,
    pub symptoms_count: usize,
    pub primary_disease: String,
    pub risk_level: RiskLevel,
    pub severity_level: SeverityLevel,
}

impl SessionSummary {
    pub fn of(session: &SymptomSession, completed_at: DateTime<Utc>) -> Self {
        let analysis = session.analysis();
        Self {
            id: session.id.clone(),
            date: completed_at,
            symptoms_count: session.total_symptoms(),
            primary_disease: analysis
                .and_then(|a| a.primary_suspected_disease.clone())
                .unwrap_or_else(|| UNKNOWN_DISEASE.to_string()),
            risk_level: RiskLevel::from_score(analysis.and_then(|a| a.overall_risk_score).unwrap_or(0.0)),
            severity_level: analysis.and_then(|a| a.severity_level).unwrap_or(SeverityLevel::Mild),
        }
    }
}

/// Prevention tips for one disease, grouped by category
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreventionTips {
    pub tips_by_category: BTreeMap<String, Vec<Value>>,
    pub total_tips: usize,
}

/// Values outside the known vocabulary decode to `None`
fn known<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| serde_json::from_value(value).ok()))
}

/// Names the backend sometimes sends as numeric ids
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserInfo;
    use serde_json::json;

    fn response() -> AnalysisResponse {
        serde_json::from_value(json!({
            "session_id": 41,
            "overall_risk_score": 64.5,
            "severity_level": "severe",
            "primary_suspected_disease": "Malaria",
            "emergency_recommended": false,
            "nearest_clinic_recommended": true,
            "needs_followup": true,
            "followup_date": "2024-03-04",
            "disease_analyses": [
                {"disease": 2, "disease_name": "Typhoid", "probability_percentage": 22.0, "calculated_score": 3.1},
                {"disease": 1, "disease_name": "Malaria", "disease_type": "parasitic", "probability_percentage": 71.5, "severity_assessment": "high", "calculated_score": 8.4},
                {"disease": 3, "disease_name": "Influenza", "probability_percentage": 40.0, "calculated_score": 5.0}
            ],
            "recommendation": "Visit a clinic within 24 hours",
            "prevention_tips": ["Sleep under a treated net"]
        }))
        .unwrap()
    }

    #[test]
    fn test_diseases_sorted_by_probability() {
        let result = AnalysisResult::from_response(&response(), &["cough"]);
        let names: Vec<&str> = result.diseases.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Malaria", "Influenza", "Typhoid"]);
        assert_eq!(result.diseases[0].id, Some(RecordId::Numeric(1)));
        assert_eq!(result.diseases[0].disease_type.as_deref(), Some("parasitic"));
    }

    #[test]
    fn test_summary_and_risk() {
        let result = AnalysisResult::from_response(&response(), &["cough"]);
        assert_eq!(result.session_id, Some(RecordId::Numeric(41)));
        assert_eq!(result.risk_assessment.level, RiskLevel::High);
        assert_eq!(result.risk_assessment.urgency, "Urgent medical care needed");
        assert!(result.summary.clinic_visit_recommended);
        assert!(!result.summary.emergency_recommended);
        assert_eq!(result.recommendations.immediate[0].title, "Contact Healthcare Provider");
        assert_eq!(result.immediate_advice.as_deref(), Some("Visit a clinic within 24 hours"));
    }

    #[test]
    fn test_local_detection_raises_emergency() {
        let result = AnalysisResult::from_response(&response(), &["fever", "seizures"]);
        assert!(result.summary.emergency_recommended);
        assert_eq!(result.recommendations.immediate[0].title, "Seek Emergency Care");
    }

    #[test]
    fn test_sparse_response_decodes() {
        let sparse: AnalysisResponse =
            serde_json::from_value(json!({"severity_level": "catastrophic", "primary_suspected_disease": 7})).unwrap();
        assert_eq!(sparse.severity_level, None);
        assert_eq!(sparse.primary_suspected_disease.as_deref(), Some("7"));

        let result = AnalysisResult::from_response::<&str>(&sparse, &[]);
        assert_eq!(result.risk_assessment.level, RiskLevel::Minimal);
        assert_eq!(result.risk_assessment.urgency, "Self-care appropriate");
        assert!(result.diseases.is_empty());
    }

    #[test]
    fn test_quick_check_defaults() {
        let quick: QuickCheckResponse = serde_json::from_value(json!({
            "symptoms_analyzed": ["cough", "sneezing"],
            "overall_risk_score": 25,
            "recommendation": ""
        }))
        .unwrap();
        let result = QuickCheckResult::from_response(&quick, &["cough", "sneezing"]);
        assert_eq!(result.summary.total_symptoms, 2);
        assert_eq!(result.summary.risk_level, RiskLevel::Low);
        assert!(!result.summary.emergency_recommended);
        assert_eq!(result.recommendation, "Please consult a healthcare provider.");
    }

    #[test]
    fn test_session_summary_defaults() {
        let mut session = SymptomSession::new(UserInfo::default(), Utc::now());
        session.add_symptom("fever");
        session.add_custom_symptom("chills");
        let completed_at = Utc::now();

        session.record_analysis(AnalysisResponse::default());
        let summary = SessionSummary::of(&session, completed_at);
        assert_eq!(summary.symptoms_count, 2);
        assert_eq!(summary.primary_disease, "Unknown");
        assert_eq!(summary.severity_level, SeverityLevel::Mild);
        assert_eq!(summary.risk_level, RiskLevel::Minimal);

        session.record_analysis(response());
        let summary = SessionSummary::of(&session, completed_at);
        assert_eq!(summary.primary_disease, "Malaria");
        assert_eq!(summary.risk_level, RiskLevel::High);
        assert_eq!(session.server_session_id(), Some(&RecordId::Numeric(41)));
    }

    #[test]
    fn test_prevention_tips_shape() {
        let tips: PreventionTips = serde_json::from_value(json!({
            "tips_by_category": {"hygiene": [{"title": "Wash hands"}]},
            "total_tips": 1
        }))
        .unwrap();
        assert_eq!(tips.total_tips, 1);
        assert_eq!(tips.tips_by_category["hygiene"].len(), 1);
        assert_eq!(PreventionTips::default().total_tips, 0);
    }
}
