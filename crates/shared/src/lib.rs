//! IDMS Shared Utilities
//!
//! This crate provides common functionality for the IDMS client crates:
//! - Error taxonomy shared by every operation
//! - Role-based access control (single capability table)
//! - Field validation with accumulated errors
//! - Backend client, token store and error-message normalization
//! - All-settled batch helper, cancellable poller and response sequencing
//! - Configuration and logging setup

use serde::{Deserialize, Serialize};

// Re-export commonly used items
pub use access_control::*;
pub use types::*;
pub use validation::*;
pub use batch::*;

/// HTTP backend client, typed response envelopes and auth helpers
pub mod api;

/// Disease metadata shared by priority classification and symptom analysis
pub mod diseases;

/// Client configuration (TOML file + environment overrides)
pub mod config;

/// Cancellable periodic tasks and last-issued-wins response ordering
pub mod polling;

/// `tracing` subscriber setup
pub mod telemetry;

/// Scripted in-memory backend for tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Common types and the error taxonomy
pub mod types {
    use super::*;
    use thiserror::Error;

    /// Errors surfaced by every IDMS client operation.
    ///
    /// All variants are recoverable at the UI layer; nothing here is retried.
    #[derive(Clone, Debug, Error, PartialEq, Eq)]
    pub enum IdmsError {
        /// Missing required field, malformed input, count bounds
        #[error("Validation error: {0}")]
        Validation(String),
        /// Role check failure
        #[error("Permission denied: {0}")]
        PermissionDenied(String),
        /// State-machine precondition violated
        #[error("Invalid transition: {0}")]
        InvalidTransition(String),
        /// Referenced record absent
        #[error("Not found: {0}")]
        NotFound(String),
        /// Symptom session operation issued before a session was started
        #[error("No active session. Please start a session first.")]
        NoActiveSession,
        /// Backend unreachable or non-2xx response; message already normalized
        #[error("{0}")]
        Network(String),
        /// Backend rejected the stored token; local credentials were cleared
        #[error("Unauthorized: {0}")]
        Unauthorized(String),
        /// Response body did not match the expected envelope
        #[error("Unexpected response shape: {0}")]
        Decode(String),
        /// Configuration could not be loaded
        #[error("Configuration error: {0}")]
        Config(String),
    }

    impl From<serde_json::Error> for IdmsError {
        fn from(err: serde_json::Error) -> Self {
            IdmsError::Decode(err.to_string())
        }
    }

    pub type IdmsResult<T> = Result<T, IdmsError>;

    /// Identifier assigned by the backend.
    ///
    /// The REST API uses integer primary keys, but some endpoints return them as strings.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display)]
    #[serde(untagged)]
    pub enum RecordId {
        #[display(fmt = "{}", _0)]
        Numeric(u64),
        #[display(fmt = "{}", _0)]
        Text(String),
    }

    impl From<u64> for RecordId {
        fn from(id: u64) -> Self {
            RecordId::Numeric(id)
        }
    }

    impl From<&str> for RecordId {
        fn from(id: &str) -> Self {
            RecordId::Text(id.to_string())
        }
    }
}

/// Access control module - one capability table consulted by every transition
pub mod access_control {
    use super::*;

    /// Staff and patient roles known to the backend (`user.role.name`)
    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, derive_more::Display)]
    pub enum Role {
        Admin,
        Doctor,
        Nurse,
        #[serde(rename = "Emergency_Coordinator")]
        #[display(fmt = "Emergency_Coordinator")]
        EmergencyCoordinator,
        Patient,
        /// Any role name this client does not recognize; granted nothing
        #[serde(other)]
        Unknown,
    }

    /// Actions gated by role
    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, derive_more::Display)]
    pub enum Action {
        CreateEmergency,
        ApproveEmergency,
        RejectEmergency,
        DispatchEmergency,
        CompleteEmergency,
        ViewEmergencyDashboard,
        ManageUsers,
        ManageClinics,
    }

    const EMERGENCY_STAFF: &[Action] = &[
        Action::CreateEmergency,
        Action::ApproveEmergency,
        Action::RejectEmergency,
        Action::DispatchEmergency,
        Action::CompleteEmergency,
        Action::ViewEmergencyDashboard,
    ];

    const ADMIN: &[Action] = &[
        Action::CreateEmergency,
        Action::ApproveEmergency,
        Action::RejectEmergency,
        Action::DispatchEmergency,
        Action::CompleteEmergency,
        Action::ViewEmergencyDashboard,
        Action::ManageUsers,
        Action::ManageClinics,
    ];

    /// Capability table: role -> allowed actions
    pub fn allowed_actions(role: Role) -> &'static [Action] {
        match role {
            Role::Admin => ADMIN,
            Role::Doctor | Role::Nurse | Role::EmergencyCoordinator => EMERGENCY_STAFF,
            Role::Patient => &[Action::CreateEmergency],
            Role::Unknown => &[],
        }
    }

    /// The signed-in user as cached after login
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    pub struct ActingUser {
        pub id: RecordId,
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub first_name: String,
        #[serde(default)]
        pub last_name: String,
        #[serde(with = "role_field")]
        pub role: Role,
    }

    impl ActingUser {
        /// Name used for audit attribution; falls back to the email
        pub fn display_name(&self) -> String {
            let full = format!("{} {}", self.first_name, self.last_name);
            let full = full.trim();
            if full.is_empty() {
                self.email.clone()
            } else {
                full.to_string()
            }
        }

        pub fn can(&self, action: Action) -> bool {
            allowed_actions(self.role).contains(&action)
        }
    }

    /// Check `user` against the capability table.
    ///
    /// # Returns
    /// * `Ok(())` - the role grants `action`
    /// * `Err(IdmsError::PermissionDenied)` - otherwise
    pub fn authorize(user: &ActingUser, action: Action) -> IdmsResult<()> {
        if user.can(action) {
            Ok(())
        } else {
            Err(IdmsError::PermissionDenied(format!(
                "role {} may not perform {}",
                user.role, action
            )))
        }
    }

    /// The backend nests the role as `{"id": .., "name": "Nurse"}`; older
    /// payloads send the bare name.
    mod role_field {
        use super::Role;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RoleRepr {
            Named { name: Role },
            Plain(Role),
        }

        #[derive(Serialize)]
        struct NamedRole {
            name: Role,
        }

        pub fn serialize<S: Serializer>(role: &Role, serializer: S) -> Result<S::Ok, S::Error> {
            NamedRole { name: *role }.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
            Ok(match RoleRepr::deserialize(deserializer)? {
                RoleRepr::Named { name } => name,
                RoleRepr::Plain(role) => role,
            })
        }
    }
}

/// Field validation with accumulated, coded errors
pub mod validation {
    use super::*;

    /// Validation error with detailed context
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ValidationError {
        pub field: String,
        pub message: String,
        pub code: ValidationErrorCode,
    }

    /// Specific validation error codes for programmatic handling
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub enum ValidationErrorCode {
        Required,
        InvalidFormat,
        OutOfRange,
        TooMany,
        InvalidChoice,
    }

    impl std::fmt::Display for ValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}: {}", self.field, self.message)
        }
    }

    /// Validation result that can accumulate multiple errors
    #[derive(Clone, Debug, Default)]
    pub struct ValidationResult {
        pub errors: Vec<ValidationError>,
    }

    impl ValidationResult {
        pub fn new() -> Self {
            Self { errors: Vec::new() }
        }

        pub fn add_error(&mut self, field: &str, message: &str, code: ValidationErrorCode) {
            self.errors.push(ValidationError {
                field: field.to_string(),
                message: message.to_string(),
                code,
            });
        }

        pub fn is_valid(&self) -> bool {
            self.errors.is_empty()
        }

        pub fn messages(&self) -> Vec<String> {
            self.errors.iter().map(|e| e.message.clone()).collect()
        }

        pub fn into_result(self) -> IdmsResult<()> {
            if self.is_valid() {
                Ok(())
            } else {
                let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
                Err(IdmsError::Validation(messages.join("; ")))
            }
        }

        pub fn merge(&mut self, other: ValidationResult) {
            self.errors.extend(other.errors);
        }
    }

    /// Require a non-blank text field
    pub fn require_text(value: &str, field: &str, label: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        if value.trim().is_empty() {
            result.add_error(field, &format!("{} is required", label), ValidationErrorCode::Required);
        }
        result
    }

    /// Require `value`, when present, to be one of `choices`
    pub fn validate_choice(value: Option<&str>, choices: &[&str], field: &str, label: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(value) = value {
            if !value.is_empty() && !choices.contains(&value) {
                result.add_error(
                    field,
                    &format!("{} must be one of: {}", label, choices.join(", ")),
                    ValidationErrorCode::InvalidChoice,
                );
            }
        }
        result
    }
}

/// Concurrent fan-out with per-item outcomes
pub mod batch {
    use super::*;
    use futures::future::join_all;
    use std::future::Future;

    /// Per-item results of a fan-out; one failure never fails the batch
    #[derive(Debug)]
    pub struct BatchOutcome<K, T> {
        pub items: Vec<(K, IdmsResult<T>)>,
    }

    impl<K, T> BatchOutcome<K, T> {
        pub fn total(&self) -> usize {
            self.items.len()
        }

        pub fn succeeded(&self) -> Vec<(&K, &T)> {
            self.items
                .iter()
                .filter_map(|(key, result)| result.as_ref().ok().map(|value| (key, value)))
                .collect()
        }

        pub fn failed(&self) -> Vec<(&K, &IdmsError)> {
            self.items
                .iter()
                .filter_map(|(key, result)| result.as_ref().err().map(|err| (key, err)))
                .collect()
        }

        pub fn all_succeeded(&self) -> bool {
            self.items.iter().all(|(_, result)| result.is_ok())
        }

        /// Human-readable summary, e.g. "Failed to approve 2 out of 5 items"
        pub fn summary(&self, verb: &str) -> String {
            let failed = self.failed().len();
            if failed == 0 {
                format!("All {} items succeeded", self.total())
            } else {
                format!("Failed to {} {} out of {} items", verb, failed, self.total())
            }
        }
    }

    /// Issue `op` for every key concurrently and wait for all of them to settle.
    pub async fn settle_all<K, T, F, Fut>(keys: Vec<K>, mut op: F) -> BatchOutcome<K, T>
    where
        K: Clone,
        F: FnMut(K) -> Fut,
        Fut: Future<Output = IdmsResult<T>>,
    {
        let pending = keys.into_iter().map(|key| {
            let call = op(key.clone());
            async move { (key, call.await) }
        });

        BatchOutcome {
            items: join_all(pending).await,
        }
    }
}
