//! Risk labels, emergency-symptom detection and follow-up advice

use serde::{Deserialize, Serialize};

/// Overall risk label derived from the backend's 0..100 score
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RiskLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::Critical
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Moderate
        } else if score >= 20.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }
}

/// Severity level assigned by the backend to a whole analysis
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    #[display(fmt = "minimal")]
    Minimal,
    #[display(fmt = "mild")]
    Mild,
    #[display(fmt = "moderate")]
    Moderate,
    #[display(fmt = "severe")]
    Severe,
    #[display(fmt = "critical")]
    Critical,
}

/// How soon the patient should act; an unknown level reads as minimal
pub fn urgency_text(severity: Option<SeverityLevel>) -> &'static str {
    match severity.unwrap_or(SeverityLevel::Minimal) {
        SeverityLevel::Critical => "Immediate attention required",
        SeverityLevel::Severe => "Urgent medical care needed",
        SeverityLevel::Moderate => "Medical consultation recommended",
        SeverityLevel::Mild => "Monitor symptoms",
        SeverityLevel::Minimal => "Self-care appropriate",
    }
}

/// Substrings that flag a symptom as an emergency
pub const EMERGENCY_SYMPTOMS: [&str; 11] = [
    "difficulty_breathing",
    "chest_pain",
    "severe_chest_pain",
    "confusion",
    "seizures",
    "loss_of_consciousness",
    "blue_lips_or_fingernails",
    "severe_abdominal_pain",
    "high_fever",
    "severe_headache",
    "stroke_symptoms",
];

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyCheck {
    pub has_emergency_symptoms: bool,
    pub emergency_symptoms: Vec<String>,
    pub recommendation: String,
}

/// Flag symptoms that contain an emergency keyword or are contained in one
/// (`"fever"` matches `high_fever`).
///
/// Matching is case-insensitive and treats spaces as underscores, so free
/// text like "severe headache" matches `severe_headache`. Blank entries never match.
pub fn detect_emergency_symptoms<S: AsRef<str>>(symptoms: &[S]) -> EmergencyCheck {
    let detected: Vec<String> = symptoms
        .iter()
        .map(|symptom| symptom.as_ref())
        .filter(|symptom| {
            let symptom = symptom.trim().to_lowercase().replace(' ', "_");
            !symptom.is_empty()
                && EMERGENCY_SYMPTOMS
                    .iter()
                    .any(|keyword| symptom.contains(keyword) || keyword.contains(symptom.as_str()))
        })
        .map(str::to_string)
        .collect();

    let has_emergency_symptoms = !detected.is_empty();
    EmergencyCheck {
        has_emergency_symptoms,
        emergency_symptoms: detected,
        recommendation: if has_emergency_symptoms {
            "CRITICAL: Seek immediate emergency medical attention".to_string()
        } else {
            "Continue with normal symptom assessment".to_string()
        },
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Emergency,
    Urgent,
    Routine,
    General,
    Symptoms,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub action: String,
    pub priority: RecommendationPriority,
}

impl Recommendation {
    fn new(
        kind: RecommendationKind,
        priority: RecommendationPriority,
        title: &str,
        description: &str,
        action: &str,
    ) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description: description.to_string(),
            action: action.to_string(),
            priority,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendations {
    pub immediate: Vec<Recommendation>,
    pub lifestyle: Vec<Recommendation>,
    pub monitoring: Vec<Recommendation>,
    pub prevention: Vec<Recommendation>,
}

/// Follow-up advice for an analysis outcome
pub fn generate_recommendations(severity: Option<SeverityLevel>, emergency_recommended: bool) -> Recommendations {
    let mut recommendations = Recommendations::default();

    let immediate = if emergency_recommended || severity == Some(SeverityLevel::Critical) {
        Some(Recommendation::new(
            RecommendationKind::Emergency,
            RecommendationPriority::Critical,
            "Seek Emergency Care",
            "Your symptoms indicate a potentially serious condition. Please seek immediate medical attention.",
            "Go to nearest emergency room or call emergency services",
        ))
    } else if severity == Some(SeverityLevel::Severe) {
        Some(Recommendation::new(
            RecommendationKind::Urgent,
            RecommendationPriority::High,
            "Contact Healthcare Provider",
            "Your symptoms warrant medical evaluation. Please contact your healthcare provider today.",
            "Schedule urgent appointment or visit walk-in clinic",
        ))
    } else if severity == Some(SeverityLevel::Moderate) {
        Some(Recommendation::new(
            RecommendationKind::Routine,
            RecommendationPriority::Medium,
            "Schedule Medical Consultation",
            "Consider scheduling an appointment with your healthcare provider within the next few days.",
            "Book appointment with your doctor",
        ))
    } else {
        None
    };
    recommendations.immediate.extend(immediate);

    recommendations.lifestyle.push(Recommendation::new(
        RecommendationKind::General,
        RecommendationPriority::Low,
        "Rest and Hydration",
        "Get adequate rest and stay well-hydrated to support your body's healing process.",
        "Drink plenty of fluids and get adequate sleep",
    ));
    recommendations.monitoring.push(Recommendation::new(
        RecommendationKind::Symptoms,
        RecommendationPriority::Medium,
        "Monitor Your Symptoms",
        "Keep track of your symptoms and seek medical attention if they worsen.",
        "Track symptom changes and duration",
    ));

    recommendations
}
