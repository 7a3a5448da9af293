//! Chronological event list reconstructed from a request's timestamps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApprovalStatus, EmergencyRequest};

/// Attribution used when a "by" field is absent
pub const SYSTEM_ACTOR: &str = "System";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, derive_more::Display)]
pub enum AuditAction {
    #[display(fmt = "Request Created")]
    Created,
    #[display(fmt = "Request Approved")]
    Approved,
    #[display(fmt = "Request Rejected")]
    Rejected,
    #[display(fmt = "Ambulance Dispatched")]
    Dispatched,
    #[display(fmt = "Ambulance Arrived")]
    Arrived,
    #[display(fmt = "Patient In Transit")]
    InTransit,
    #[display(fmt = "Request Completed")]
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor: String,
    pub details: String,
}

/// One entry per lifecycle timestamp that is set, oldest first.
///
/// Sorting is by timestamp, not lifecycle order, so skewed stored data still
/// yields a non-decreasing list.
pub fn build_audit_trail(request: &EmergencyRequest) -> Vec<AuditEntry> {
    let actor = |by: &Option<String>| by.clone().unwrap_or_else(|| SYSTEM_ACTOR.to_string());
    let mut trail = vec![AuditEntry {
        timestamp: request.request_time,
        action: AuditAction::Created,
        actor: actor(&request.patient_name),
        details: format!(
            "Emergency request at {}: {}",
            request.location, request.condition_description
        ),
    }];

    if let Some(at) = request.approved_at {
        match request.approval_status {
            ApprovalStatus::Approved => trail.push(AuditEntry {
                timestamp: at,
                action: AuditAction::Approved,
                actor: actor(&request.approved_by),
                details: request
                    .approval_comments
                    .clone()
                    .unwrap_or_else(|| "Request approved".to_string()),
            }),
            ApprovalStatus::Rejected => trail.push(AuditEntry {
                timestamp: at,
                action: AuditAction::Rejected,
                actor: actor(&request.approved_by),
                details: format!(
                    "Rejected: {}",
                    request.rejection_reason.as_deref().unwrap_or("no reason given")
                ),
            }),
            ApprovalStatus::Pending => {}
        }
    }

    if let Some(at) = request.dispatched_at {
        let mut details = format!(
            "Ambulance {} dispatched",
            request.assigned_ambulance.as_deref().unwrap_or("(unassigned)")
        );
        if let Some(hospital) = &request.hospital_destination {
            details.push_str(&format!(" to {}", hospital));
        }
        trail.push(AuditEntry {
            timestamp: at,
            action: AuditAction::Dispatched,
            actor: actor(&request.dispatched_by),
            details,
        });
    }

    if let Some(at) = request.arrived_at {
        trail.push(AuditEntry {
            timestamp: at,
            action: AuditAction::Arrived,
            actor: SYSTEM_ACTOR.to_string(),
            details: format!("Ambulance arrived at {}", request.location),
        });
    }

    if let Some(at) = request.in_transit_at {
        trail.push(AuditEntry {
            timestamp: at,
            action: AuditAction::InTransit,
            actor: SYSTEM_ACTOR.to_string(),
            details: match &request.hospital_destination {
                Some(hospital) => format!("Patient in transit to {}", hospital),
                None => "Patient in transit".to_string(),
            },
        });
    }

    if let Some(at) = request.completed_at {
        trail.push(AuditEntry {
            timestamp: at,
            action: AuditAction::Completed,
            actor: actor(&request.completed_by),
            details: "Emergency request completed".to_string(),
        });
    }

    trail.sort_by_key(|entry| entry.timestamp);
    trail
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::fixtures::*;
    use proptest::prelude::*;

    fn maybe_minute() -> impl Strategy<Value = Option<i64>> {
        proptest::option::of(-500i64..500)
    }

    proptest! {
        #[test]
        fn trail_is_sorted(
            approved in maybe_minute(),
            dispatched in maybe_minute(),
            arrived in maybe_minute(),
            transit in maybe_minute(),
            done in maybe_minute(),
            rejected in any::<bool>(),
        ) {
            let mut req = request(1);
            req.approval_status = if rejected { ApprovalStatus::Rejected } else { ApprovalStatus::Approved };
            req.approved_at = approved.map(at);
            req.dispatched_at = dispatched.map(at);
            req.arrived_at = arrived.map(at);
            req.in_transit_at = transit.map(at);
            req.completed_at = done.map(at);

            let trail = build_audit_trail(&req);
            let expected = 1 + [approved, dispatched, arrived, transit, done].iter().flatten().count();
            prop_assert_eq!(trail.len(), expected);
            prop_assert!(trail.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
        }
    }
}
