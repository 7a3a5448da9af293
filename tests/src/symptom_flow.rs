//! Symptom Checker to Emergency Tests
//!
//! A patient's symptom session is analysed, escalated to emergency services,
//! and the resulting request is classified with the disease library the
//! checker loaded.

#[cfg(test)]
mod escalation_tests {
    use std::sync::Arc;

    use emergency_coordinator::{EmergencyService, REQUESTS_PATH};
    use emergency_integrity::*;
    use idms_shared::testing::FakeBackend;
    use idms_shared::RecordId;
    use serde_json::{json, Value};
    use symptoms_coordinator::*;
    use symptoms_integrity::{RiskLevel, UserInfo};

    use crate::fixtures::*;

    fn library(backend: &FakeBackend) {
        backend.respond(
            "GET",
            SYMPTOMS_PATH,
            Ok(json!({"symptoms": ["fever", "diarrhea", "vomiting", "confusion", "pale_skin"]})),
        );
        backend.respond(
            "GET",
            DISEASES_PATH,
            Ok(json!([
                {"id": 4, "name": "Cholera", "emergency_threshold": "high", "is_contagious": true},
                {"id": 5, "name": "Malaria", "emergency_threshold": "medium"}
            ])),
        );
    }

    fn analysis() -> Value {
        json!({
            "session_id": 300,
            "overall_risk_score": 83,
            "severity_level": "critical",
            "primary_suspected_disease": "Cholera",
            "emergency_recommended": true,
            "disease_analyses": [
                {"disease": 5, "disease_name": "Malaria", "probability_percentage": 20.0},
                {"disease": 4, "disease_name": "Cholera", "probability_percentage": 74.0}
            ]
        })
    }

    #[tokio::test]
    async fn test_session_escalates_to_classified_emergency() {
        let backend = Arc::new(FakeBackend::new());
        library(&backend);
        backend.respond("POST", ANALYSIS_PATH, Ok(analysis()));
        backend.respond(
            "POST",
            "symptom-sessions/300/request_emergency/",
            Ok(json!({"emergency_request_id": 88})),
        );
        backend.respond(
            "GET",
            "emergencies/88/",
            Ok(with(
                pending_record(88, "diarrhea, vomiting"),
                json!({"suspected_disease": "Cholera"}),
            )),
        );

        let mut checker = SymptomAnalysisEngine::new(backend.clone());
        checker.initialize().await.unwrap();
        checker.start_session(UserInfo {
            location: Some("Rusizi".to_string()),
            ..UserInfo::default()
        });
        checker.add_symptom("diarrhea").unwrap();
        checker.add_symptom("vomiting").unwrap();

        let result = checker.analyze().await.unwrap();
        assert_eq!(result.risk_assessment.level, RiskLevel::Critical);
        assert_eq!(result.diseases[0].name, "Cholera");
        assert!(result.summary.emergency_recommended);

        let escalation = checker.request_emergency_services("Rusizi", None).await.unwrap();

        let emergencies = EmergencyService::new(backend.clone()).with_diseases(checker.diseases().clone());
        let created = emergencies.get(&escalation.emergency_request_id).await.unwrap();
        assert_eq!(created.status, EmergencyStatus::Pending);
        assert_eq!(emergencies.priority_of(&created), Priority::Critical);
    }

    #[tokio::test]
    async fn test_emergency_drafted_from_stored_session() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond(
            "GET",
            "symptom-sessions/300/",
            Ok(json!({
                "symptoms": ["fever", "confusion"],
                "primary_disease_name": "Malaria",
                "severity_level": "severe",
                "overall_risk_score": 66.5
            })),
        );
        backend.respond("POST", REQUESTS_PATH, Ok(pending_record(89, "fever, confusion")));

        let emergencies = EmergencyService::new(backend.clone());
        let created = emergencies
            .emergency_from_symptom_session("300", "Nyagatare", Some("-1.2986,30.3275".to_string()))
            .await
            .unwrap();
        assert_eq!(created.id, RecordId::Numeric(89));

        let sent = backend
            .calls()
            .into_iter()
            .find(|call| call.method == "POST")
            .and_then(|call| call.body)
            .unwrap();
        assert_eq!(sent["condition_description"], "fever, confusion");
        assert_eq!(sent.get("priority_override"), None);
        assert_eq!(sent["urgency_level"], "urgent");
        assert_eq!(sent["gps_coordinates"], "-1.2986,30.3275");
        assert_eq!(sent["additional_notes"], "Created from symptom session #300. Risk score: 66.5");
    }

    #[tokio::test]
    async fn test_history_survives_session_clear() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("POST", ANALYSIS_PATH, Ok(analysis()));
        let mut checker = SymptomAnalysisEngine::new(backend.clone());

        checker.start_session(UserInfo::default());
        checker.add_symptom("fever").unwrap();
        checker.analyze().await.unwrap();
        checker.clear_session();

        assert!(checker.session().is_none());
        assert_eq!(checker.session_history().len(), 1);
        assert_eq!(checker.session_history()[0].primary_disease, "Cholera");
        assert!(checker.request_emergency_services("Rusizi", None).await.is_err());
    }
}
