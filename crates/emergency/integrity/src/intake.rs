//! New-request validation and the payload sent to the backend

use idms_shared::{require_text, validate_choice, IdmsError, IdmsResult, RecordId, ValidationErrorCode, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{non_blank, Priority, UrgencyLevel};

/// `"<lat>,<lon>"` with optional sign and fraction, no whitespace
static GPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+\.?\d*,-?\d+\.?\d*$").expect("GPS pattern is a valid regex"));

fn is_gps_format(text: &str) -> bool {
    GPS_RE.is_match(text)
}

/// Signed decimal-degree position
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    /// Parse the backend's `"<lat>,<lon>"` string
    pub fn parse(text: &str) -> IdmsResult<GpsCoordinates> {
        let text = text.trim();
        if !is_gps_format(text) {
            return Err(IdmsError::Validation(
                "GPS coordinates must be in \"latitude,longitude\" format".to_string(),
            ));
        }

        let (lat, lon) = text
            .split_once(',')
            .ok_or_else(|| IdmsError::Validation("GPS coordinates are missing a comma".to_string()))?;
        let latitude: f64 = lat
            .parse()
            .map_err(|_| IdmsError::Validation(format!("invalid latitude: {}", lat)))?;
        let longitude: f64 = lon
            .parse()
            .map_err(|_| IdmsError::Validation(format!("invalid longitude: {}", lon)))?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(IdmsError::Validation(format!("latitude {} is out of range", latitude)));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(IdmsError::Validation(format!("longitude {} is out of range", longitude)));
        }

        Ok(GpsCoordinates { latitude, longitude })
    }
}

impl std::fmt::Display for GpsCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Form input for a new emergency request, as typed by the requester
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NewEmergencyRequest {
    pub location: String,
    pub condition_description: String,
    pub suspected_disease: Option<String>,
    pub urgency_level: Option<String>,
    pub priority_override: Option<String>,
    pub additional_notes: Option<String>,
    pub clinic: Option<RecordId>,
    pub gps_coordinates: Option<String>,
}

/// Check a new request before it is sent
pub fn validate_new_request(input: &NewEmergencyRequest) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.merge(require_text(&input.location, "location", "Location"));
    result.merge(require_text(&input.condition_description, "condition_description", "Condition description"));

    if let Some(gps) = input.gps_coordinates.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        if !is_gps_format(gps) {
            result.add_error(
                "gps_coordinates",
                "GPS coordinates must be in \"latitude,longitude\" format",
                ValidationErrorCode::InvalidFormat,
            );
        } else if let Err(IdmsError::Validation(message)) = GpsCoordinates::parse(gps) {
            result.add_error("gps_coordinates", &message, ValidationErrorCode::OutOfRange);
        }
    }

    result.merge(validate_choice(
        input.priority_override.as_deref(),
        &Priority::CHOICES,
        "priority_override",
        "Priority",
    ));
    result.merge(validate_choice(
        input.urgency_level.as_deref(),
        &UrgencyLevel::CHOICES,
        "urgency_level",
        "Urgency level",
    ));
    result
}

impl NewEmergencyRequest {
    /// Validate, trim and serialize for `POST emergencies/`.
    ///
    /// Blank optional fields are left out. `priority_override` is checked
    /// but never sent: an override is only recorded when a reviewer approves.
    pub fn into_payload(self) -> IdmsResult<Value> {
        validate_new_request(&self).into_result()?;

        let urgency = self
            .urgency_level
            .as_deref()
            .and_then(non_blank)
            .unwrap_or_else(|| UrgencyLevel::default().to_string());

        let mut payload = Map::new();
        payload.insert("location".to_string(), json!(self.location.trim()));
        payload.insert("condition_description".to_string(), json!(self.condition_description.trim()));
        payload.insert("urgency_level".to_string(), json!(urgency));
        for (key, value) in [
            ("suspected_disease", &self.suspected_disease),
            ("additional_notes", &self.additional_notes),
            ("gps_coordinates", &self.gps_coordinates),
        ] {
            if let Some(text) = value.as_deref().and_then(non_blank) {
                payload.insert(key.to_string(), json!(text));
            }
        }
        if let Some(clinic) = self.clinic {
            payload.insert("clinic".to_string(), serde_json::to_value(clinic)?);
        }
        Ok(Value::Object(payload))
    }

    /// Pre-fill a request from a completed symptom assessment.
    ///
    /// Severity maps to priority and urgency: critical is critical/immediate,
    /// severe is urgent/urgent, anything else normal/standard.
    pub fn from_symptom_session(session_id: &str, session: &SymptomSessionRecord, location: &str) -> NewEmergencyRequest {
        let (priority, urgency) = match session.severity_level.as_deref() {
            Some("critical") => (Priority::Critical, UrgencyLevel::Immediate),
            Some("severe") => (Priority::Urgent, UrgencyLevel::Urgent),
            _ => (Priority::Normal, UrgencyLevel::Standard),
        };
        let condition = if session.symptoms.is_empty() {
            "Symptoms reported via symptom checker".to_string()
        } else {
            session.symptoms.join(", ")
        };
        let risk = session
            .overall_risk_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        NewEmergencyRequest {
            location: location.to_string(),
            condition_description: condition,
            suspected_disease: session.primary_disease_name.clone(),
            urgency_level: Some(urgency.to_string()),
            priority_override: Some(priority.to_string()),
            additional_notes: Some(format!(
                "Created from symptom session #{}. Risk score: {}",
                session_id, risk
            )),
            clinic: None,
            gps_coordinates: None,
        }
    }
}

/// The parts of a stored symptom session (`symptom-sessions/{id}/`) used to open an emergency
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SymptomSessionRecord {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub primary_disease_name: Option<String>,
    #[serde(default)]
    pub severity_level: Option<String>,
    #[serde(default)]
    pub overall_risk_score: Option<f64>,
}
