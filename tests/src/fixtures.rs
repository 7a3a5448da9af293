//! Shared builders for backend records and users

use chrono::{DateTime, Duration, TimeZone, Utc};
use emergency_integrity::EmergencyRequest;
use idms_shared::{ActingUser, RecordId, Role};
use serde_json::{json, Value};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 6, 0, 0).unwrap()
}

pub fn minutes(n: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(n)
}

/// Pending, unapproved request as the backend returns it
pub fn pending_record(id: u64, condition: &str) -> Value {
    json!({
        "id": id,
        "status": "P",
        "approval_status": "pending",
        "location": "Rubavu district hospital road",
        "condition_description": condition,
        "request_time": t0().to_rfc3339(),
    })
}

/// `record` with extra fields merged over it
pub fn with(mut record: Value, fields: Value) -> Value {
    if let (Some(target), Value::Object(extra)) = (record.as_object_mut(), fields) {
        target.extend(extra);
    }
    record
}

pub fn request(record: Value) -> EmergencyRequest {
    serde_json::from_value(record).unwrap()
}

pub fn user(role: Role) -> ActingUser {
    ActingUser {
        id: RecordId::Numeric(9),
        email: "staff@idms.test".to_string(),
        first_name: "Grace".to_string(),
        last_name: "Mukamana".to_string(),
        role,
    }
}
