//! Emergency Request Lifecycle Tests
//!
//! Drives one request from creation to completion through the coordinator
//! against a scripted backend, checking that every transition is validated
//! locally before anything is sent.

#[cfg(test)]
mod lifecycle_tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use emergency_coordinator::{EmergencyDashboard, EmergencyService, REQUESTS_PATH};
    use emergency_integrity::*;
    use idms_shared::testing::FakeBackend;
    use idms_shared::{IdmsError, RecordId, Role};
    use serde_json::{json, Value};

    use crate::fixtures::*;

    fn clock() -> DateTime<Utc> {
        minutes(3)
    }

    fn service(backend: &Arc<FakeBackend>) -> EmergencyService<FakeBackend> {
        EmergencyService::new(backend.clone()).with_clock(clock)
    }

    fn approved(id: u64) -> Value {
        with(
            pending_record(id, "road accident, severe bleeding"),
            json!({
                "approval_status": "approved",
                "approved_by_name": "Grace Mukamana",
                "approved_at": minutes(2).to_rfc3339(),
            }),
        )
    }

    fn stage(id: u64, status: &str, extra: Value) -> Value {
        with(
            with(
                approved(id),
                json!({
                    "status": "D",
                    "assigned_ambulance": "AMB-014",
                    "hospital_destination": "CHUB",
                    "dispatched_at": minutes(5).to_rfc3339(),
                    "dispatched_by_name": "Grace Mukamana",
                }),
            ),
            with(json!({ "status": status }), extra),
        )
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("POST", REQUESTS_PATH, Ok(pending_record(11, "road accident, severe bleeding")));
        backend.respond("POST", "emergencies/11/approve/", Ok(approved(11)));
        backend.respond("POST", "emergencies/11/dispatch/", Ok(stage(11, "D", json!({}))));
        backend
            .respond(
                "POST",
                "emergencies/11/update_status/",
                Ok(stage(11, "A", json!({"arrived_at": minutes(15).to_rfc3339()}))),
            )
            .respond(
                "POST",
                "emergencies/11/update_status/",
                Ok(stage(
                    11,
                    "T",
                    json!({"arrived_at": minutes(15).to_rfc3339(), "in_transit_at": minutes(20).to_rfc3339()}),
                )),
            )
            .respond(
                "POST",
                "emergencies/11/update_status/",
                Ok(stage(
                    11,
                    "C",
                    json!({
                        "arrived_at": minutes(15).to_rfc3339(),
                        "in_transit_at": minutes(20).to_rfc3339(),
                        "completed_at": minutes(40).to_rfc3339(),
                        "completed_by_name": "Grace Mukamana",
                    }),
                )),
            );

        let emergencies = service(&backend);
        let staff = user(Role::Nurse);

        let created = emergencies
            .create(NewEmergencyRequest {
                location: " Rubavu district hospital road ".to_string(),
                condition_description: "road accident, severe bleeding".to_string(),
                gps_coordinates: Some("-1.6792,29.2600".to_string()),
                ..NewEmergencyRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(emergencies.priority_of(&created), Priority::Critical);

        let approval = ApprovalInput {
            comments: "cleared".to_string(),
            ..ApprovalInput::default()
        };
        let approved = emergencies.approve(&created, &approval, &staff).await.unwrap();
        let dispatched = emergencies
            .dispatch(
                &approved,
                &DispatchInput {
                    ambulance_id: "AMB-014".to_string(),
                    hospital_destination: "CHUB".to_string(),
                    estimated_arrival: None,
                },
                &staff,
            )
            .await
            .unwrap();
        let arrived = emergencies.mark_arrived(&dispatched).await.unwrap();
        let in_transit = emergencies.mark_in_transit(&arrived).await.unwrap();
        let completed = emergencies.complete(&in_transit, &staff).await.unwrap();

        assert_eq!(completed.status, EmergencyStatus::Completed);
        assert!(completed.check_invariants().is_valid());

        let statuses: Vec<Value> = backend
            .calls()
            .into_iter()
            .filter(|call| call.path == "emergencies/11/update_status/")
            .filter_map(|call| call.body)
            .collect();
        assert_eq!(statuses, vec![json!({"status": "A"}), json!({"status": "T"}), json!({"status": "C"})]);

        let trail = build_audit_trail(&completed);
        assert_eq!(trail.len(), 6);
        assert_eq!(trail.last().map(|entry| entry.action), Some(AuditAction::Completed));
        assert!(trail.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_rejected_transitions_never_reach_backend() {
        let backend = Arc::new(FakeBackend::new());
        let emergencies = service(&backend);
        let pending = request(pending_record(12, "fever"));

        let err = emergencies
            .approve(&pending, &ApprovalInput::default(), &user(Role::Patient))
            .await
            .unwrap_err();
        assert!(matches!(err, IdmsError::PermissionDenied(_)));

        let dispatched = request(stage(12, "D", json!({})));
        let err = emergencies.complete(&dispatched, &user(Role::Doctor)).await.unwrap_err();
        assert!(matches!(err, IdmsError::InvalidTransition(_)));

        let err = emergencies
            .reject(&pending, &RejectionInput::default(), &user(Role::Doctor))
            .await
            .unwrap_err();
        assert!(matches!(err, IdmsError::Validation(_)));

        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_approve_reports_per_item() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("POST", "emergencies/21/approve/", Ok(approved(21)));
        backend.respond("POST", "emergencies/22/approve/", Ok(approved(22)));
        let emergencies = service(&backend);

        let batch = vec![
            request(pending_record(21, "fever")),
            request(pending_record(22, "fever")),
            request(approved(23)),
        ];
        let outcome = emergencies
            .bulk_approve(&batch, &ApprovalInput::default(), &user(Role::Admin))
            .await;

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.succeeded().len(), 2);
        let failed = outcome.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, &RecordId::Numeric(23));
        assert_eq!(outcome.summary("approve"), "Failed to approve 1 out of 3 items");
    }

    #[tokio::test]
    async fn test_dashboard_applies_transition_results() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond(
            "GET",
            REQUESTS_PATH,
            Ok(json!({"count": 2, "next": null, "results": [pending_record(31, "fever"), approved(32)]})),
        );
        backend.respond("POST", "emergencies/32/dispatch/", Ok(stage(32, "D", json!({}))));

        let dashboard = EmergencyDashboard::new(service(&backend));
        dashboard.refresh().await.unwrap();
        assert_eq!(dashboard.stats().pending_approval, 1);

        let target = dashboard.requests()[1].clone();
        let input = DispatchInput {
            ambulance_id: "AMB-014".to_string(),
            hospital_destination: "CHUB".to_string(),
            estimated_arrival: Some("15 min".to_string()),
        };
        let updated = dashboard
            .service()
            .dispatch(&target, &input, &user(Role::EmergencyCoordinator))
            .await
            .unwrap();
        dashboard.replace(updated);

        let stats = dashboard.stats();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.pending, 1);
    }
}
