//! Property-Based Tests for the Approval Workflow
//!
//! Random sequences of reviewer and dispatcher actions are applied to one
//! request; whatever succeeds must leave the request consistent.

use emergency_integrity::{ApprovalInput, DispatchInput, EmergencyRequest, EmergencyStatus, RejectionInput};
use idms_shared::{ActingUser, IdmsResult};

/// One step a reviewer or dispatcher might attempt
#[derive(Clone, Copy, Debug)]
pub enum Step {
    Approve,
    Reject,
    Dispatch,
    Arrive,
    Transit,
    Complete,
}

/// Apply `step` at minute `minute`; failures leave `request` unchanged
pub fn apply(request: &EmergencyRequest, step: Step, user: &ActingUser, minute: i64) -> IdmsResult<EmergencyRequest> {
    let now = crate::fixtures::minutes(minute);
    match step {
        Step::Approve => request.approve(
            &ApprovalInput {
                comments: format!("approved at {}", minute),
                ..ApprovalInput::default()
            },
            user,
            now,
        ),
        Step::Reject => request.reject(
            &RejectionInput {
                reason: format!("rejected at {}", minute),
                comments: String::new(),
            },
            user,
            now,
        ),
        Step::Dispatch => request.dispatch(
            &DispatchInput {
                ambulance_id: "AMB-003".to_string(),
                hospital_destination: "Ruhengeri".to_string(),
                estimated_arrival: None,
            },
            user,
            now,
        ),
        Step::Arrive => request.mark_arrived(now),
        Step::Transit => request.mark_in_transit(now),
        Step::Complete => request.complete(user, now),
    }
}

pub fn is_terminal(request: &EmergencyRequest) -> bool {
    request.status == EmergencyStatus::Completed
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::fixtures::*;
    use emergency_integrity::ApprovalStatus;
    use idms_shared::{IdmsError, Role};
    use proptest::prelude::*;

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Approve),
            Just(Step::Reject),
            Just(Step::Dispatch),
            Just(Step::Arrive),
            Just(Step::Transit),
            Just(Step::Complete),
        ]
    }

    fn role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Admin),
            Just(Role::Doctor),
            Just(Role::Nurse),
            Just(Role::EmergencyCoordinator),
            Just(Role::Patient),
        ]
    }

    proptest! {
        #[test]
        fn random_walks_keep_invariants(
            steps in proptest::collection::vec((step(), role(), -30i64..120), 0..25)
        ) {
            let mut current = request(pending_record(1, "fever"));
            for (step, role, minute) in steps {
                let before = current.clone();
                match apply(&current, step, &user(role), minute) {
                    Ok(next) => current = next,
                    Err(_) => prop_assert_eq!(&current, &before),
                }
                prop_assert!(current.check_invariants().is_valid(), "{:?}", current.check_invariants().messages());
                if current.approval_status == ApprovalStatus::Pending {
                    prop_assert_eq!(current.status, EmergencyStatus::Pending);
                }
            }
        }

        #[test]
        fn unapproved_dispatch_always_invalid(role in role(), minute in 0i64..600, rejected in any::<bool>()) {
            let mut req = request(pending_record(1, "fever"));
            if rejected {
                req = apply(&req, Step::Reject, &user(Role::Nurse), 1).unwrap();
            }
            let err = apply(&req, Step::Dispatch, &user(role), minute).unwrap_err();
            prop_assert!(matches!(err, IdmsError::InvalidTransition(_)));
        }

        #[test]
        fn reapproval_overwrites_rejection(rounds in 1usize..5) {
            let nurse = user(Role::Nurse);
            let mut req = request(pending_record(1, "fever"));
            for round in 0..rounds {
                let minute = round as i64 * 10;
                req = apply(&req, Step::Approve, &nurse, minute + 1).unwrap();
                prop_assert_eq!(req.rejection_reason.clone(), None);
                req = apply(&req, Step::Reject, &nurse, minute + 2).unwrap();
                prop_assert_eq!(req.approval_status, ApprovalStatus::Rejected);
                prop_assert_eq!(req.approval_comments.clone(), None);
            }
            req = apply(&req, Step::Approve, &nurse, 100).unwrap();
            prop_assert_eq!(req.approval_status, ApprovalStatus::Approved);
            prop_assert_eq!(&req.rejection_reason, &None);
            prop_assert!(!is_terminal(&req));
        }
    }
}
