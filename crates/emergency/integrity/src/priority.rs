//! Display priority of a request

use chrono::{DateTime, Duration, Utc};
use idms_shared::diseases::{DiseaseCatalog, EmergencyThreshold};

use crate::{EmergencyRequest, EmergencyStatus, Priority};

/// Condition keywords that make a request critical on their own
pub const CRITICAL_KEYWORDS: [&str; 5] = ["critical", "severe", "unconscious", "cardiac", "stroke"];

/// Pending requests older than this are escalated from normal to urgent
pub const ESCALATION_AFTER_MINUTES: i64 = 30;

/// Compute the display priority of `request` at `now`.
///
/// 1. a reviewer's override wins outright
/// 2. a critical keyword in the condition description
/// 3. the suspected disease's emergency threshold (high / medium)
/// 4. a pending request waiting more than 30 minutes becomes urgent
/// 5. otherwise normal
pub fn classify_priority(request: &EmergencyRequest, diseases: &DiseaseCatalog, now: DateTime<Utc>) -> Priority {
    if let Some(priority) = request.priority_override {
        return priority;
    }

    let condition = request.condition_description.to_lowercase();
    if CRITICAL_KEYWORDS.iter().any(|keyword| condition.contains(keyword)) {
        return Priority::Critical;
    }

    let threshold = request
        .suspected_disease
        .as_deref()
        .and_then(|name| diseases.lookup(name))
        .and_then(|disease| disease.emergency_threshold);
    match threshold {
        Some(EmergencyThreshold::High) => return Priority::Critical,
        Some(EmergencyThreshold::Medium) => return Priority::Urgent,
        _ => {}
    }

    if request.status == EmergencyStatus::Pending
        && now - request.request_time > Duration::minutes(ESCALATION_AFTER_MINUTES)
    {
        return Priority::Urgent;
    }

    Priority::Normal
}
