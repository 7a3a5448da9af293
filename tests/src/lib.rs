//! IDMS Client Test Suite
//!
//! Cross-crate tests for the emergency and symptom checker crates:
//! - Acceptance scenarios for priority, dispatch gating, statistics and symptom analysis
//! - Emergency request lifecycle against a scripted backend
//! - Symptom checker sessions escalating into emergency requests
//! - Property tests over the approval workflow

pub mod emergency_flow;
pub mod fixtures;
pub mod scenarios;
pub mod symptom_flow;
pub mod workflow_properties;
