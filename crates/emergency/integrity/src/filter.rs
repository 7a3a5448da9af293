//! Dashboard filters over emergency requests

use chrono::{DateTime, Utc};
use idms_shared::api::Query;
use idms_shared::diseases::DiseaseCatalog;
use serde::{Deserialize, Serialize};

use crate::{classify_priority, ApprovalStatus, EmergencyRequest, EmergencyStatus, Priority};

/// Criteria the dashboard narrows its list by; `None` matches everything
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EmergencyFilter {
    pub status: Option<EmergencyStatus>,
    pub approval_status: Option<ApprovalStatus>,
    pub priority: Option<Priority>,
    pub disease: Option<String>,
    /// Case-insensitive match on location, condition, disease or ambulance
    pub search: Option<String>,
}

impl EmergencyFilter {
    pub fn matches(&self, request: &EmergencyRequest, diseases: &DiseaseCatalog, now: DateTime<Utc>) -> bool {
        if self.status.map_or(false, |status| status != request.status) {
            return false;
        }
        if self
            .approval_status
            .map_or(false, |approval| approval != request.approval_status)
        {
            return false;
        }
        if let Some(disease) = self.disease.as_deref().filter(|d| !d.trim().is_empty()) {
            let matches = request
                .suspected_disease
                .as_deref()
                .map_or(false, |suspected| suspected.trim().eq_ignore_ascii_case(disease.trim()));
            if !matches {
                return false;
            }
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let haystacks = [
                Some(request.location.as_str()),
                Some(request.condition_description.as_str()),
                request.suspected_disease.as_deref(),
                request.assigned_ambulance.as_deref(),
                request.patient_name.as_deref(),
            ];
            if !haystacks
                .iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&term))
            {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if classify_priority(request, diseases, now) != priority {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(
        &self,
        requests: &'a [EmergencyRequest],
        diseases: &DiseaseCatalog,
        now: DateTime<Utc>,
    ) -> Vec<&'a EmergencyRequest> {
        requests
            .iter()
            .filter(|request| self.matches(request, diseases, now))
            .collect()
    }

    /// Server-side narrowing for `GET emergencies/`.
    ///
    /// Priority is derived on the client and never sent.
    pub fn to_query(&self) -> Query {
        let mut query = Vec::new();
        if let Some(status) = self.status {
            query.push(("status".to_string(), status.code().to_string()));
        }
        if let Some(approval) = self.approval_status {
            query.push(("approval_status".to_string(), approval.code().to_string()));
        }
        if let Some(disease) = self.disease.as_deref().filter(|d| !d.trim().is_empty()) {
            query.push(("suspected_disease".to_string(), disease.trim().to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query.push(("search".to_string(), search.trim().to_string()));
        }
        query
    }
}
