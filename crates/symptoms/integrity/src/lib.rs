//! Symptom checker domain
//!
//! Pure, synchronous building blocks for the symptom checker: the symptom
//! vocabulary and its categories, the live session, risk and emergency
//! assessment, and the presentation of backend analysis results. Network
//! orchestration lives in `symptoms_coordinator`.

pub mod analysis;
pub mod assessment;
pub mod session;
pub mod vocabulary;

pub use analysis::*;
pub use assessment::*;
pub use session::*;
pub use vocabulary::*;
