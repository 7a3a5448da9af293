//! Symptom Analysis Coordinator
//!
//! [`SymptomAnalysisEngine`] is the context object a symptom-checker view
//! owns: it caches the vocabulary and disease library, holds the one live
//! session, re-evaluates emergency symptoms on every change, and sends the
//! session to the backend for scoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use idms_shared::api::{decode_list, decode_one, Backend};
use idms_shared::config::SymptomConfig;
use idms_shared::diseases::{Disease, DiseaseCatalog};
use idms_shared::{require_text, IdmsError, IdmsResult, RecordId, ValidationErrorCode, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use symptoms_integrity::*;
use tracing::{debug, info, warn};

/// Symptom vocabulary known to the backend
pub const SYMPTOMS_PATH: &str = "diseases/available_symptoms/";

/// Disease library
pub const DISEASES_PATH: &str = "diseases/";

/// Full analysis of a session
pub const ANALYSIS_PATH: &str = "symptom-checks/";

/// Stateless scoring of a bare symptom list
pub const QUICK_CHECK_PATH: &str = "symptom-checks/quick_check/";

pub const PREVENTION_TIPS_PATH: &str = "prevention-tips/by-disease/";

fn emergency_path(session_id: &RecordId) -> String {
    format!("symptom-sessions/{}/request_emergency/", session_id)
}

#[derive(Debug, Deserialize)]
struct AvailableSymptoms {
    symptoms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmergencyCreated {
    emergency_request_id: RecordId,
}

/// What [`SymptomAnalysisEngine::initialize`] loaded
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitSummary {
    pub symptoms_count: usize,
    pub diseases_count: usize,
}

/// Outcome of escalating an analysed session to emergency services
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyEscalation {
    pub emergency_request_id: RecordId,
    pub message: String,
}

/// Symptom checker state for one client
pub struct SymptomAnalysisEngine<B: Backend> {
    backend: Arc<B>,
    config: SymptomConfig,
    clock: fn() -> DateTime<Utc>,
    vocabulary: Option<Vec<String>>,
    diseases: DiseaseCatalog,
    session: Option<SymptomSession>,
    emergency: EmergencyCheck,
    history: Vec<SessionSummary>,
}

impl<B: Backend> SymptomAnalysisEngine<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            config: SymptomConfig::default(),
            clock: Utc::now,
            vocabulary: None,
            diseases: DiseaseCatalog::default(),
            session: None,
            emergency: detect_emergency_symptoms::<String>(&[]),
            history: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SymptomConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall clock (tests pin it)
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Load the vocabulary and disease library.
    ///
    /// Runs once per engine; later calls report the cached counts without
    /// contacting the backend.
    pub async fn initialize(&mut self) -> IdmsResult<InitSummary> {
        if let Some(vocabulary) = &self.vocabulary {
            debug!("symptom checker already initialized");
            return Ok(InitSummary {
                symptoms_count: vocabulary.len(),
                diseases_count: self.diseases.len(),
            });
        }

        let body = self.backend.get(SYMPTOMS_PATH, &Vec::new()).await?;
        let available: AvailableSymptoms = decode_one(body)?;
        let body = self.backend.get(DISEASES_PATH, &Vec::new()).await?;
        let diseases = decode_list::<Disease>(body)?;

        let mut vocabulary = Vec::with_capacity(available.symptoms.len());
        for symptom in available.symptoms {
            if !vocabulary.contains(&symptom) {
                vocabulary.push(symptom);
            }
        }

        self.diseases = DiseaseCatalog::new(diseases.results);
        let summary = InitSummary {
            symptoms_count: vocabulary.len(),
            diseases_count: self.diseases.len(),
        };
        self.vocabulary = Some(vocabulary);
        info!(
            symptoms = summary.symptoms_count,
            diseases = summary.diseases_count,
            "symptom checker initialized"
        );
        Ok(summary)
    }

    pub fn is_initialized(&self) -> bool {
        self.vocabulary.is_some()
    }

    fn vocabulary(&self) -> &[String] {
        self.vocabulary.as_deref().unwrap_or(&[])
    }

    pub fn diseases(&self) -> &DiseaseCatalog {
        &self.diseases
    }

    pub fn get_categorized_symptoms(&self) -> Vec<CategoryGroup> {
        categorize(self.vocabulary())
    }

    /// The whole vocabulary, flat, for search boxes
    pub fn all_symptoms(&self) -> Vec<SymptomOption> {
        self.vocabulary().iter().map(|symptom| SymptomOption::new(symptom)).collect()
    }

    pub fn symptom_suggestions(&self, query: &str) -> Vec<SymptomSuggestion> {
        symptom_suggestions(self.vocabulary(), query)
    }

    /// Start a fresh session, discarding any live one
    pub fn start_session(&mut self, user_info: UserInfo) -> &SymptomSession {
        if let Some(previous) = &self.session {
            debug!(session = %previous.id, "replacing live symptom session");
        }
        let session = SymptomSession::new(user_info, (self.clock)());
        info!(session = %session.id, "symptom session started");
        self.emergency = detect_emergency_symptoms::<String>(&[]);
        self.session.insert(session)
    }

    pub fn session(&self) -> Option<&SymptomSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> IdmsResult<&mut SymptomSession> {
        self.session.as_mut().ok_or(IdmsError::NoActiveSession)
    }

    pub fn add_symptom(&mut self, symptom: &str) -> IdmsResult<Vec<String>> {
        let selected = self.session_mut()?.add_symptom(symptom).to_vec();
        debug!(symptom, "symptom added");
        self.reassess();
        Ok(selected)
    }

    pub fn remove_symptom(&mut self, symptom: &str) -> IdmsResult<Vec<String>> {
        let selected = self.session_mut()?.remove_symptom(symptom).to_vec();
        debug!(symptom, "symptom removed");
        self.reassess();
        Ok(selected)
    }

    pub fn add_custom_symptom(&mut self, symptom: &str) -> IdmsResult<Vec<String>> {
        let custom = self.session_mut()?.add_custom_symptom(symptom).to_vec();
        self.reassess();
        Ok(custom)
    }

    /// Empty when no session is live
    pub fn current_symptoms(&self) -> CurrentSymptoms {
        self.session
            .as_ref()
            .map(SymptomSession::current_symptoms)
            .unwrap_or_default()
    }

    /// Emergency symptoms in the live session, as of the last change
    pub fn emergency_check(&self) -> &EmergencyCheck {
        &self.emergency
    }

    fn reassess(&mut self) {
        let symptoms = self.current_symptoms().all;
        let check = detect_emergency_symptoms(&symptoms);
        if check.has_emergency_symptoms && !self.emergency.has_emergency_symptoms {
            warn!(symptoms = ?check.emergency_symptoms, "emergency symptoms reported");
        }
        self.emergency = check;
    }

    /// Score the live session on the backend.
    ///
    /// The session is validated before any request is made. A successful
    /// analysis replaces the session's previous one and is added to history.
    pub async fn analyze(&mut self) -> IdmsResult<AnalysisResult> {
        let max_symptoms = self.config.max_symptoms;
        let payload = self
            .session
            .as_ref()
            .ok_or(IdmsError::NoActiveSession)?
            .analysis_payload(max_symptoms)?;

        let body = match self.backend.post(ANALYSIS_PATH, payload).await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "symptom analysis failed");
                return Err(err);
            }
        };
        let response: AnalysisResponse = decode_one(body)?;

        let completed_at = (self.clock)();
        let session = self.session_mut()?;
        let result = AnalysisResult::from_response(&response, &session.all_symptoms());
        session.record_analysis(response);
        let summary = SessionSummary::of(session, completed_at);

        info!(
            session = %summary.id,
            risk = %result.risk_assessment.level,
            emergency = result.summary.emergency_recommended,
            "symptom analysis completed"
        );
        self.history.push(summary);
        Ok(result)
    }

    /// Score `symptoms` without touching the session
    pub async fn quick_check(&self, symptoms: &[String]) -> IdmsResult<QuickCheckResult> {
        let mut validation = ValidationResult::new();
        if symptoms.iter().all(|symptom| symptom.trim().is_empty()) {
            validation.add_error("symptoms", "Please select at least one symptom", ValidationErrorCode::Required);
        }
        if symptoms.len() > self.config.max_symptoms {
            validation.add_error(
                "symptoms",
                &format!(
                    "Please select no more than {} symptoms for accurate analysis",
                    self.config.max_symptoms
                ),
                ValidationErrorCode::TooMany,
            );
        }
        validation.into_result()?;

        let body = self.backend.post(QUICK_CHECK_PATH, json!({ "symptoms": symptoms })).await?;
        let response: QuickCheckResponse = decode_one(body)?;
        Ok(QuickCheckResult::from_response(&response, symptoms))
    }

    /// Prevention tips for `disease`; a failed lookup yields no tips
    pub async fn prevention_tips(&self, disease: &str) -> PreventionTips {
        let query = vec![("disease".to_string(), disease.trim().to_string())];
        let fetched = match self.backend.get(PREVENTION_TIPS_PATH, &query).await {
            Ok(body) => decode_one::<PreventionTips>(body),
            Err(err) => Err(err),
        };
        fetched.unwrap_or_else(|err| {
            warn!(disease, error = %err, "prevention tips unavailable");
            PreventionTips::default()
        })
    }

    /// Turn the analysed session into an emergency ambulance request
    pub async fn request_emergency_services(
        &self,
        location: &str,
        gps_coordinates: Option<&str>,
    ) -> IdmsResult<EmergencyEscalation> {
        let session_id = self
            .session
            .as_ref()
            .and_then(SymptomSession::server_session_id)
            .ok_or_else(|| IdmsError::NotFound("No active analysis session found".to_string()))?;
        require_text(location, "location", "Location").into_result()?;

        let body = json!({
            "location": location.trim(),
            "gps_coordinates": gps_coordinates.map(str::trim).unwrap_or_default(),
        });
        let response = self.backend.post(&emergency_path(session_id), body).await?;
        let created: EmergencyCreated = decode_one(response)?;
        info!(
            session = %session_id,
            emergency = %created.emergency_request_id,
            "emergency services requested from symptom session"
        );

        Ok(EmergencyEscalation {
            emergency_request_id: created.emergency_request_id,
            message: "Emergency services have been notified. Help is on the way.".to_string(),
        })
    }

    /// Completed analyses, oldest first
    pub fn session_history(&self) -> &[SessionSummary] {
        &self.history
    }

    pub fn clear_session(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = %session.id, "symptom session cleared");
        }
        self.emergency = detect_emergency_symptoms::<String>(&[]);
    }
}
