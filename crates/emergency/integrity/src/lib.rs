//! Emergency Ambulance Request Integrity
//!
//! Canonical representation of one emergency ambulance request and the only
//! legal ways it may change:
//!
//! ```text
//! Pending -> Dispatched -> Arrived -> InTransit -> Completed
//!    ^
//!    approval gate (pending / approved / rejected), checked only at Pending -> Dispatched
//! ```
//!
//! Every transition takes the current snapshot and returns a new one; the
//! caller persists it and swaps it in only when the backend accepts the change.
//! Nothing in this crate performs I/O or reads the system clock.

use chrono::{DateTime, Utc};
use idms_shared::{authorize, Action, ActingUser, IdmsError, IdmsResult, RecordId, ValidationErrorCode, ValidationResult};
use serde::{Deserialize, Serialize};

pub mod audit;
pub mod filter;
pub mod intake;
pub mod priority;
pub mod statistics;

pub use audit::*;
pub use filter::*;
pub use intake::*;
pub use priority::*;
pub use statistics::*;

/// Ambulance lifecycle, encoded on the wire as a single letter
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmergencyStatus {
    #[serde(rename = "P")]
    Pending,
    #[serde(rename = "D")]
    Dispatched,
    #[serde(rename = "A")]
    Arrived,
    #[serde(rename = "T")]
    InTransit,
    #[serde(rename = "C")]
    Completed,
}

impl EmergencyStatus {
    pub const ALL: [EmergencyStatus; 5] = [
        EmergencyStatus::Pending,
        EmergencyStatus::Dispatched,
        EmergencyStatus::Arrived,
        EmergencyStatus::InTransit,
        EmergencyStatus::Completed,
    ];

    /// Wire code (`P`, `D`, `A`, `T`, `C`)
    pub fn code(self) -> &'static str {
        match self {
            EmergencyStatus::Pending => "P",
            EmergencyStatus::Dispatched => "D",
            EmergencyStatus::Arrived => "A",
            EmergencyStatus::InTransit => "T",
            EmergencyStatus::Completed => "C",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EmergencyStatus::Pending => "Pending",
            EmergencyStatus::Dispatched => "Dispatched",
            EmergencyStatus::Arrived => "Arrived",
            EmergencyStatus::InTransit => "In Transit",
            EmergencyStatus::Completed => "Completed",
        }
    }

    /// The single status reachable from this one
    pub fn next(self) -> Option<EmergencyStatus> {
        match self {
            EmergencyStatus::Pending => Some(EmergencyStatus::Dispatched),
            EmergencyStatus::Dispatched => Some(EmergencyStatus::Arrived),
            EmergencyStatus::Arrived => Some(EmergencyStatus::InTransit),
            EmergencyStatus::InTransit => Some(EmergencyStatus::Completed),
            EmergencyStatus::Completed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == EmergencyStatus::Completed
    }
}

impl std::fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Staff review gate in front of dispatch
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 3] = [ApprovalStatus::Pending, ApprovalStatus::Approved, ApprovalStatus::Rejected];

    pub fn code(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending Approval",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Display priority of a request
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[display(fmt = "critical")]
    Critical,
    #[display(fmt = "urgent")]
    Urgent,
    #[display(fmt = "normal")]
    Normal,
}

impl Priority {
    pub const CHOICES: [&'static str; 3] = ["critical", "urgent", "normal"];
}

/// How fast the requester says help is needed
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    #[display(fmt = "immediate")]
    Immediate,
    #[display(fmt = "urgent")]
    Urgent,
    #[default]
    #[display(fmt = "standard")]
    Standard,
    #[display(fmt = "non_urgent")]
    NonUrgent,
}

impl UrgencyLevel {
    pub const CHOICES: [&'static str; 4] = ["immediate", "urgent", "standard", "non_urgent"];
}

/// One emergency ambulance request as returned by `emergencies/`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmergencyRequest {
    /// Backend-assigned, immutable
    pub id: RecordId,
    pub status: EmergencyStatus,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default)]
    pub location: String,
    /// `"<lat>,<lon>"` in signed decimal degrees
    #[serde(default, deserialize_with = "lenient::option")]
    pub gps_coordinates: Option<String>,
    #[serde(default)]
    pub condition_description: String,
    /// Key into the disease catalog
    #[serde(default, deserialize_with = "lenient::option")]
    pub suspected_disease: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub additional_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub clinic_name: Option<String>,
    /// Set at creation, immutable
    pub request_time: DateTime<Utc>,

    // Approval / rejection
    #[serde(rename = "approved_by_name", default, deserialize_with = "lenient::text")]
    pub approved_by: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub approval_comments: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub rejection_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient::known")]
    pub priority_override: Option<Priority>,
    #[serde(default, deserialize_with = "lenient::known")]
    pub urgency_level: Option<UrgencyLevel>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub recommended_hospital: Option<String>,

    // Dispatch
    #[serde(default, deserialize_with = "lenient::text")]
    pub assigned_ambulance: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub hospital_destination: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub estimated_arrival: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[serde(rename = "dispatched_by_name", default, deserialize_with = "lenient::text")]
    pub dispatched_by: Option<String>,

    // Transport
    #[serde(default, deserialize_with = "lenient::option")]
    pub arrived_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub in_transit_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "completed_by_name", default, deserialize_with = "lenient::text")]
    pub completed_by: Option<String>,
}

/// Reviewer input for [`EmergencyRequest::approve`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ApprovalInput {
    pub comments: String,
    pub priority_override: Option<Priority>,
    pub urgency_level: Option<UrgencyLevel>,
    pub recommended_hospital: Option<String>,
}

/// Reviewer input for [`EmergencyRequest::reject`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RejectionInput {
    pub reason: String,
    pub comments: String,
}

/// Dispatcher input for [`EmergencyRequest::dispatch`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DispatchInput {
    pub ambulance_id: String,
    pub hospital_destination: String,
    pub estimated_arrival: Option<String>,
}

impl EmergencyRequest {
    /// Clear a pending (or previously rejected) request for dispatch.
    ///
    /// Overwrites every approval field, so a rejection reason never survives
    /// a later approval.
    pub fn approve(&self, input: &ApprovalInput, user: &ActingUser, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        self.require_status(EmergencyStatus::Pending, "approve")?;
        if self.approval_status == ApprovalStatus::Approved {
            return Err(IdmsError::InvalidTransition(format!(
                "request {} is already approved",
                self.id
            )));
        }
        authorize(user, Action::ApproveEmergency)?;

        let mut next = self.clone();
        next.approval_status = ApprovalStatus::Approved;
        next.approved_by = Some(user.display_name());
        next.approved_at = Some(self.stamp(now));
        next.approval_comments = non_blank(&input.comments);
        next.rejection_reason = None;
        next.priority_override = input.priority_override;
        next.urgency_level = input.urgency_level;
        next.recommended_hospital = input.recommended_hospital.as_deref().and_then(non_blank);
        Ok(next)
    }

    /// Turn a request down. The reason is mandatory.
    ///
    /// The reviewer is recorded in the same fields an approval uses.
    pub fn reject(&self, input: &RejectionInput, user: &ActingUser, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        self.require_status(EmergencyStatus::Pending, "reject")?;
        if self.approval_status == ApprovalStatus::Rejected {
            return Err(IdmsError::InvalidTransition(format!(
                "request {} is already rejected",
                self.id
            )));
        }
        authorize(user, Action::RejectEmergency)?;

        idms_shared::require_text(&input.reason, "reason", "Rejection reason").into_result()?;

        let mut next = self.clone();
        next.approval_status = ApprovalStatus::Rejected;
        next.approved_by = Some(user.display_name());
        next.approved_at = Some(self.stamp(now));
        next.approval_comments = non_blank(&input.comments);
        next.rejection_reason = Some(input.reason.trim().to_string());
        next.priority_override = None;
        next.urgency_level = None;
        next.recommended_hospital = None;
        Ok(next)
    }

    /// Assign an ambulance. Only approved, still-pending requests may leave `Pending`.
    pub fn dispatch(&self, input: &DispatchInput, user: &ActingUser, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        if self.approval_status != ApprovalStatus::Approved {
            return Err(IdmsError::InvalidTransition(format!(
                "request {} must be approved before dispatch (approval is {})",
                self.id,
                self.approval_status.code()
            )));
        }
        self.require_status(EmergencyStatus::Pending, "dispatch")?;
        authorize(user, Action::DispatchEmergency)?;
        idms_shared::require_text(&input.ambulance_id, "ambulance_id", "Ambulance ID").into_result()?;

        let mut next = self.clone();
        next.status = EmergencyStatus::Dispatched;
        next.assigned_ambulance = Some(input.ambulance_id.trim().to_string());
        next.hospital_destination = non_blank(&input.hospital_destination);
        next.estimated_arrival = input.estimated_arrival.as_deref().and_then(non_blank);
        next.dispatched_at = Some(self.stamp(now));
        next.dispatched_by = Some(user.display_name());
        Ok(next)
    }

    pub fn mark_arrived(&self, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        self.require_status(EmergencyStatus::Dispatched, "mark arrived")?;
        let mut next = self.clone();
        next.status = EmergencyStatus::Arrived;
        next.arrived_at = Some(self.stamp(now));
        Ok(next)
    }

    pub fn mark_in_transit(&self, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        self.require_status(EmergencyStatus::Arrived, "mark in transit")?;
        let mut next = self.clone();
        next.status = EmergencyStatus::InTransit;
        next.in_transit_at = Some(self.stamp(now));
        Ok(next)
    }

    /// Close the request. Only `InTransit -> Completed` is legal.
    pub fn complete(&self, user: &ActingUser, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        self.require_status(EmergencyStatus::InTransit, "complete")?;
        authorize(user, Action::CompleteEmergency)?;
        let mut next = self.clone();
        next.status = EmergencyStatus::Completed;
        next.completed_at = Some(self.stamp(now));
        next.completed_by = Some(user.display_name());
        Ok(next)
    }

    /// Advance one step along the status chain.
    ///
    /// Used when the target status arrives as data (e.g. a status picker);
    /// anything other than the immediate successor is rejected.
    pub fn advance_to(&self, target: EmergencyStatus, user: &ActingUser, now: DateTime<Utc>) -> IdmsResult<EmergencyRequest> {
        match target {
            EmergencyStatus::Arrived => self.mark_arrived(now),
            EmergencyStatus::InTransit => self.mark_in_transit(now),
            EmergencyStatus::Completed => self.complete(user, now),
            EmergencyStatus::Dispatched => Err(IdmsError::InvalidTransition(
                "dispatch requires an ambulance assignment".to_string(),
            )),
            EmergencyStatus::Pending => Err(IdmsError::InvalidTransition(format!(
                "request {} cannot move back to Pending",
                self.id
            ))),
        }
    }

    /// Lifecycle timestamps that are set, in lifecycle order
    pub fn lifecycle_timestamps(&self) -> Vec<DateTime<Utc>> {
        [
            Some(self.request_time),
            self.approved_at,
            self.dispatched_at,
            self.arrived_at,
            self.in_transit_at,
            self.completed_at,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Report data defects in a record received from the backend
    pub fn check_invariants(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.approval_status == ApprovalStatus::Pending && self.status != EmergencyStatus::Pending {
            result.add_error(
                "approval_status",
                "Request left Pending without approval",
                ValidationErrorCode::InvalidFormat,
            );
        }
        if self.status != EmergencyStatus::Pending && self.approval_status != ApprovalStatus::Approved {
            result.add_error(
                "status",
                "Only approved requests may be dispatched",
                ValidationErrorCode::InvalidFormat,
            );
        }

        let stamps = self.lifecycle_timestamps();
        if stamps.windows(2).any(|pair| pair[1] < pair[0]) {
            result.add_error(
                "timestamps",
                "Lifecycle timestamps are out of order",
                ValidationErrorCode::OutOfRange,
            );
        }

        result
    }

    fn require_status(&self, expected: EmergencyStatus, operation: &str) -> IdmsResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(IdmsError::InvalidTransition(format!(
                "cannot {} request {}: status is {}, expected {}",
                operation, self.id, self.status, expected
            )))
        }
    }

    /// Clamp `now` so stamped timestamps never precede earlier lifecycle events
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.lifecycle_timestamps()
            .into_iter()
            .fold(now, |latest, stamp| latest.max(stamp))
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Serde helpers for the loosely typed backend payloads
mod lenient {
    use serde::de::{DeserializeOwned, Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    /// `null` and blank strings decode to `None`
    pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(D::Error::custom),
        }
    }

    /// Enum values outside this client's vocabulary decode to `None`
    pub fn known<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| serde_json::from_value(value).ok()))
    }

    /// Text fields the backend sometimes sends as numeric ids
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        })
    }
}
