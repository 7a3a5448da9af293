//! Derived analytics over a list of requests
//!
//! The critical-case count here is deliberately cruder than
//! [`crate::classify_priority`]: reports built on the backend statistics
//! endpoint use the same two-word heuristic, so the two must not be unified.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ApprovalStatus, EmergencyRequest, EmergencyStatus};

/// Counts and timings for the emergency dashboard
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmergencyStatistics {
    #[serde(alias = "total_requests")]
    pub total: usize,
    #[serde(alias = "pending_requests")]
    pub pending: usize,
    pub dispatched: usize,
    pub arrived: usize,
    pub in_transit: usize,
    pub completed: usize,
    pub pending_approval: usize,
    pub approved: usize,
    pub rejected: usize,
    pub average_approval_time_minutes: i64,
    pub by_disease: BTreeMap<String, usize>,
    pub critical_cases: usize,
}

/// Percentages derived from [`EmergencyStatistics`]
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyMetrics {
    pub approval_rate: u32,
    pub rejection_rate: u32,
    pub completion_rate: u32,
}

/// Reduce `requests` to dashboard counts
pub fn aggregate(requests: &[EmergencyRequest]) -> EmergencyStatistics {
    let mut stats = EmergencyStatistics {
        total: requests.len(),
        ..EmergencyStatistics::default()
    };

    let mut approval_minutes = Vec::new();

    for request in requests {
        match request.status {
            EmergencyStatus::Pending => stats.pending += 1,
            EmergencyStatus::Dispatched => stats.dispatched += 1,
            EmergencyStatus::Arrived => stats.arrived += 1,
            EmergencyStatus::InTransit => stats.in_transit += 1,
            EmergencyStatus::Completed => stats.completed += 1,
        }

        match request.approval_status {
            ApprovalStatus::Pending => stats.pending_approval += 1,
            ApprovalStatus::Approved => {
                stats.approved += 1;
                if let Some(approved_at) = request.approved_at {
                    let seconds = (approved_at - request.request_time).num_seconds();
                    approval_minutes.push(seconds as f64 / 60.0);
                }
            }
            ApprovalStatus::Rejected => stats.rejected += 1,
        }

        if let Some(disease) = request.suspected_disease.as_deref().map(str::trim) {
            if !disease.is_empty() {
                *stats.by_disease.entry(disease.to_string()).or_insert(0) += 1;
            }
        }

        let condition = request.condition_description.to_lowercase();
        if condition.contains("critical") || condition.contains("severe") {
            stats.critical_cases += 1;
        }
    }

    if !approval_minutes.is_empty() {
        let mean = approval_minutes.iter().sum::<f64>() / approval_minutes.len() as f64;
        stats.average_approval_time_minutes = mean.round() as i64;
    }

    stats
}

/// Approval, rejection and completion percentages, rounded; 0 on an empty denominator
pub fn derive_metrics(stats: &EmergencyStatistics) -> EmergencyMetrics {
    EmergencyMetrics {
        approval_rate: percentage(stats.approved, stats.total),
        rejection_rate: percentage(stats.rejected, stats.total),
        completion_rate: percentage(stats.completed, stats.approved),
    }
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0).round() as u32
    }
}

/// Mean response intervals in milliseconds, measured from `request_time`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseTimes {
    pub approval_count: usize,
    pub average_approval_ms: f64,
    pub dispatch_count: usize,
    pub average_dispatch_ms: f64,
    pub completion_count: usize,
    pub average_completion_ms: f64,
    pub fastest_completion_ms: Option<i64>,
    pub slowest_completion_ms: Option<i64>,
}

/// How long requests wait for approval, dispatch and completion
pub fn calculate_response_times(requests: &[EmergencyRequest]) -> ResponseTimes {
    let since_request = |request: &EmergencyRequest, stamp: Option<chrono::DateTime<chrono::Utc>>| {
        stamp.map(|at| (at - request.request_time).num_milliseconds())
    };

    let approvals: Vec<i64> = requests
        .iter()
        .filter(|r| r.approval_status == ApprovalStatus::Approved)
        .filter_map(|r| since_request(r, r.approved_at))
        .collect();
    let dispatches: Vec<i64> = requests
        .iter()
        .filter_map(|r| since_request(r, r.dispatched_at))
        .collect();
    let completions: Vec<i64> = requests
        .iter()
        .filter(|r| r.status == EmergencyStatus::Completed)
        .filter_map(|r| since_request(r, r.completed_at))
        .collect();

    ResponseTimes {
        approval_count: approvals.len(),
        average_approval_ms: mean(&approvals),
        dispatch_count: dispatches.len(),
        average_dispatch_ms: mean(&dispatches),
        completion_count: completions.len(),
        average_completion_ms: mean(&completions),
        fastest_completion_ms: completions.iter().copied().min(),
        slowest_completion_ms: completions.iter().copied().max(),
    }
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<i64>() as f64 / values.len() as f64
    }
}
