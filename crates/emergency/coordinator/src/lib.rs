//! Emergency Request Coordinator
//!
//! Orchestrates emergency ambulance requests against the backend. Every
//! transition is checked locally by the integrity state machine first; the
//! backend action endpoint is called only when that check passes, and the
//! record it returns replaces the caller's snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use emergency_integrity::*;
use idms_shared::api::{decode_list, decode_one, Backend};
use idms_shared::diseases::DiseaseCatalog;
use idms_shared::{settle_all, ActingUser, BatchOutcome, IdmsError, IdmsResult, RecordId};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub mod dashboard;

pub use dashboard::EmergencyDashboard;

/// Collection endpoint for emergency ambulance requests
pub const REQUESTS_PATH: &str = "emergencies/";

/// Server-side statistics; older backends answer 404
pub const STATISTICS_PATH: &str = "emergencies/statistics/";

/// Stored symptom checker sessions
pub const SYMPTOM_SESSIONS_PATH: &str = "symptom-sessions/";

fn record_path(id: &RecordId) -> String {
    format!("{}{}/", REQUESTS_PATH, id)
}

fn action_path(id: &RecordId, action: &str) -> String {
    format!("{}{}/{}/", REQUESTS_PATH, id, action)
}

/// Backend-facing emergency request operations
pub struct EmergencyService<B: Backend> {
    backend: Arc<B>,
    diseases: DiseaseCatalog,
    clock: fn() -> DateTime<Utc>,
}

impl<B: Backend> EmergencyService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            diseases: DiseaseCatalog::default(),
            clock: Utc::now,
        }
    }

    /// Disease metadata consulted by priority classification
    pub fn with_diseases(mut self, diseases: DiseaseCatalog) -> Self {
        self.diseases = diseases;
        self
    }

    /// Replace the wall clock (tests pin it)
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn diseases(&self) -> &DiseaseCatalog {
        &self.diseases
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Display priority of `request` right now
    pub fn priority_of(&self, request: &EmergencyRequest) -> Priority {
        classify_priority(request, &self.diseases, self.now())
    }

    /// List requests matching `filter`.
    ///
    /// Status, approval, disease and search are sent to the backend; priority
    /// is derived here and applied to the response.
    pub async fn list(&self, filter: &EmergencyFilter) -> IdmsResult<Vec<EmergencyRequest>> {
        let body = self.backend.get(REQUESTS_PATH, &filter.to_query()).await?;
        let page = decode_list::<EmergencyRequest>(body)?;
        debug!(count = page.results.len(), "fetched emergency requests");

        for request in &page.results {
            let report = request.check_invariants();
            if !report.is_valid() {
                warn!(id = %request.id, defects = ?report.messages(), "emergency request violates lifecycle invariants");
            }
        }

        let now = self.now();
        Ok(page
            .results
            .into_iter()
            .filter(|request| filter.matches(request, &self.diseases, now))
            .collect())
    }

    pub async fn get(&self, id: &RecordId) -> IdmsResult<EmergencyRequest> {
        let body = self.backend.get(&record_path(id), &Vec::new()).await?;
        decode_one(body)
    }

    /// Validate and submit a new request
    pub async fn create(&self, input: NewEmergencyRequest) -> IdmsResult<EmergencyRequest> {
        let payload = input.into_payload()?;
        let body = self.backend.post(REQUESTS_PATH, payload).await?;
        let created: EmergencyRequest = decode_one(body)?;
        info!(id = %created.id, "emergency request created");
        Ok(created)
    }

    /// Approve `request` and return the backend's updated record
    pub async fn approve(
        &self,
        request: &EmergencyRequest,
        input: &ApprovalInput,
        user: &ActingUser,
    ) -> IdmsResult<EmergencyRequest> {
        request.approve(input, user, self.now())?;
        let body = json!({
            "comments": input.comments.trim(),
            "priority": input.priority_override,
            "urgency_level": input.urgency_level,
            "recommended_hospital": input.recommended_hospital,
        });
        self.persist(request, "approve", body).await
    }

    pub async fn reject(
        &self,
        request: &EmergencyRequest,
        input: &RejectionInput,
        user: &ActingUser,
    ) -> IdmsResult<EmergencyRequest> {
        request.reject(input, user, self.now())?;
        let body = json!({
            "comments": input.comments.trim(),
            "reason": input.reason.trim(),
        });
        self.persist(request, "reject", body).await
    }

    pub async fn dispatch(
        &self,
        request: &EmergencyRequest,
        input: &DispatchInput,
        user: &ActingUser,
    ) -> IdmsResult<EmergencyRequest> {
        request.dispatch(input, user, self.now())?;
        let body = json!({
            "ambulance_id": input.ambulance_id.trim(),
            "hospital_destination": input.hospital_destination.trim(),
            "estimated_arrival": input.estimated_arrival,
        });
        self.persist(request, "dispatch", body).await
    }

    pub async fn mark_arrived(&self, request: &EmergencyRequest) -> IdmsResult<EmergencyRequest> {
        let next = request.mark_arrived(self.now())?;
        self.update_status(request, next.status).await
    }

    pub async fn mark_in_transit(&self, request: &EmergencyRequest) -> IdmsResult<EmergencyRequest> {
        let next = request.mark_in_transit(self.now())?;
        self.update_status(request, next.status).await
    }

    pub async fn complete(&self, request: &EmergencyRequest, user: &ActingUser) -> IdmsResult<EmergencyRequest> {
        let next = request.complete(user, self.now())?;
        self.update_status(request, next.status).await
    }

    async fn update_status(&self, request: &EmergencyRequest, status: EmergencyStatus) -> IdmsResult<EmergencyRequest> {
        self.persist(request, "update_status", json!({ "status": status.code() }))
            .await
    }

    async fn persist(&self, request: &EmergencyRequest, action: &str, body: Value) -> IdmsResult<EmergencyRequest> {
        let response = self.backend.post(&action_path(&request.id, action), body).await?;
        let updated: EmergencyRequest = decode_one(response)?;
        info!(id = %updated.id, action, status = %updated.status, approval = %updated.approval_status, "emergency request updated");
        Ok(updated)
    }

    /// Approve every request concurrently; one failure does not stop the rest
    pub async fn bulk_approve(
        &self,
        requests: &[EmergencyRequest],
        input: &ApprovalInput,
        user: &ActingUser,
    ) -> BatchOutcome<RecordId, EmergencyRequest> {
        let outcome = settle_all(requests.to_vec(), |request| async move {
            self.approve(&request, input, user).await
        })
        .await;
        keyed_by_id(outcome, "approve")
    }

    pub async fn bulk_reject(
        &self,
        requests: &[EmergencyRequest],
        input: &RejectionInput,
        user: &ActingUser,
    ) -> BatchOutcome<RecordId, EmergencyRequest> {
        let outcome = settle_all(requests.to_vec(), |request| async move {
            self.reject(&request, input, user).await
        })
        .await;
        keyed_by_id(outcome, "reject")
    }

    /// Dispatch one ambulance assignment per request
    pub async fn bulk_dispatch(
        &self,
        assignments: &[(EmergencyRequest, DispatchInput)],
        user: &ActingUser,
    ) -> BatchOutcome<RecordId, EmergencyRequest> {
        let outcome = settle_all(assignments.to_vec(), |(request, input)| async move {
            self.dispatch(&request, &input, user).await
        })
        .await;
        BatchOutcome {
            items: outcome
                .items
                .into_iter()
                .map(|((request, _), result)| (request.id, result))
                .collect(),
        }
        .logged("dispatch")
    }

    /// Dashboard statistics from the backend, or computed locally when the
    /// backend has no statistics endpoint
    pub async fn statistics(&self) -> IdmsResult<EmergencyStatistics> {
        match self.backend.get(STATISTICS_PATH, &Vec::new()).await {
            Ok(body) => decode_one(body),
            Err(IdmsError::NotFound(_)) => {
                debug!("statistics endpoint unavailable; aggregating locally");
                let requests = self.list(&EmergencyFilter::default()).await?;
                Ok(aggregate(&requests))
            }
            Err(err) => Err(err),
        }
    }

    /// Open an emergency request pre-filled from a stored symptom session
    pub async fn emergency_from_symptom_session(
        &self,
        session_id: &str,
        location: &str,
        gps_coordinates: Option<String>,
    ) -> IdmsResult<EmergencyRequest> {
        let path = format!("{}{}/", SYMPTOM_SESSIONS_PATH, session_id);
        let session: SymptomSessionRecord = decode_one(self.backend.get(&path, &Vec::new()).await?)?;
        let mut draft = NewEmergencyRequest::from_symptom_session(session_id, &session, location);
        draft.gps_coordinates = gps_coordinates;
        self.create(draft).await
    }
}

fn keyed_by_id(
    outcome: BatchOutcome<EmergencyRequest, EmergencyRequest>,
    verb: &str,
) -> BatchOutcome<RecordId, EmergencyRequest> {
    BatchOutcome {
        items: outcome
            .items
            .into_iter()
            .map(|(request, result)| (request.id, result))
            .collect(),
    }
    .logged(verb)
}

trait LogOutcome {
    fn logged(self, verb: &str) -> Self;
}

impl LogOutcome for BatchOutcome<RecordId, EmergencyRequest> {
    fn logged(self, verb: &str) -> Self {
        for (id, err) in self.failed() {
            warn!(%id, error = %err, "bulk {} failed for request", verb);
        }
        info!(verb, total = self.total(), summary = %self.summary(verb), "bulk operation settled");
        self
    }
}
