//! Acceptance Scenarios
//!
//! - A: an unconscious patient is critical with no other information
//! - B: dispatch before approval is an invalid transition
//! - C: completion rate is measured against approved requests
//! - D: analysis of an empty session fails before any network call
//! - E: emergency symptoms are flagged as soon as they are selected

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;

    use crate::fixtures::*;
    use emergency_integrity::*;
    use idms_shared::diseases::DiseaseCatalog;
    use idms_shared::testing::FakeBackend;
    use idms_shared::{IdmsError, Role};
    use serde_json::json;
    use symptoms_coordinator::SymptomAnalysisEngine;
    use symptoms_integrity::{detect_emergency_symptoms, UserInfo};

    #[test]
    fn test_scenario_a_unconscious_patient_is_critical() {
        let req = request(pending_record(1, "patient unconscious"));
        assert_eq!(req.priority_override, None);
        assert_eq!(req.suspected_disease, None);
        assert_eq!(
            classify_priority(&req, &DiseaseCatalog::default(), minutes(1)),
            Priority::Critical
        );
    }

    #[test]
    fn test_scenario_b_dispatch_before_approval() {
        let req = request(pending_record(2, "broken leg"));
        let input = DispatchInput {
            ambulance_id: "AMB-001".to_string(),
            ..DispatchInput::default()
        };
        let err = req.dispatch(&input, &user(Role::EmergencyCoordinator), minutes(5)).unwrap_err();
        assert!(matches!(err, IdmsError::InvalidTransition(_)));
        assert_eq!(req.status, EmergencyStatus::Pending);
        assert_eq!(req.dispatched_at, None);
    }

    #[test]
    fn test_scenario_c_completion_rate() {
        let mut requests: Vec<EmergencyRequest> = (1..=6)
            .map(|id| request(pending_record(id, "fever")))
            .collect();
        for id in 7..=8 {
            requests.push(request(with(
                pending_record(id, "fever"),
                json!({
                    "status": "C",
                    "approval_status": "approved",
                    "approved_at": minutes(4).to_rfc3339(),
                    "dispatched_at": minutes(8).to_rfc3339(),
                    "arrived_at": minutes(20).to_rfc3339(),
                    "in_transit_at": minutes(25).to_rfc3339(),
                    "completed_at": minutes(45).to_rfc3339(),
                }),
            )));
        }
        for id in 9..=10 {
            requests.push(request(with(
                pending_record(id, "fever"),
                json!({"approval_status": "approved", "approved_at": minutes(6).to_rfc3339()}),
            )));
        }

        let stats = aggregate(&requests);
        assert_eq!(stats.total, 10);
        assert_eq!(stats.approved, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.average_approval_time_minutes, 5);
        assert_eq!(derive_metrics(&stats).completion_rate, 50);
    }

    #[tokio::test]
    async fn test_scenario_d_empty_analysis_makes_no_call() {
        let backend = Arc::new(FakeBackend::new());
        let mut checker = SymptomAnalysisEngine::new(backend.clone());
        checker.start_session(UserInfo::default());

        let err = checker.analyze().await.unwrap_err();
        assert!(matches!(err, IdmsError::Validation(_)));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_scenario_e_difficulty_breathing_flagged_immediately() {
        assert!(detect_emergency_symptoms(&["difficulty_breathing"]).has_emergency_symptoms);

        let backend = Arc::new(FakeBackend::new());
        let mut checker = SymptomAnalysisEngine::new(backend.clone());
        checker.start_session(UserInfo::default());
        checker.add_symptom("difficulty_breathing").unwrap();

        let check = checker.emergency_check();
        assert!(check.has_emergency_symptoms);
        assert_eq!(check.emergency_symptoms, vec!["difficulty_breathing"]);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_empty_aggregate_is_all_zero() {
        let stats = aggregate(&[]);
        assert_eq!(stats, EmergencyStatistics::default());
        assert_eq!(derive_metrics(&stats), EmergencyMetrics::default());
    }
}
