//! Backend access
//!
//! Every call the client makes goes through the [`Backend`] trait so that
//! coordinators can be exercised against an in-memory fake. [`HttpBackend`]
//! is the production implementation over `reqwest`.

use async_trait::async_trait;
use serde_json::Value;

use crate::IdmsResult;

pub mod auth;
pub mod client;
pub mod envelope;
pub mod errors;

pub use auth::{MemoryTokenStore, TokenStore};
pub use client::HttpBackend;
pub use envelope::{decode_list, decode_one, Page};
pub use errors::{error_for_status, normalize_error_message};

/// Query-string parameters, in issuance order
pub type Query = Vec<(String, String)>;

/// REST verbs the client needs. Paths are relative to the API base URL
/// and keep the backend's trailing slash (`emergencies/12/approve/`).
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, path: &str, query: &Query) -> IdmsResult<Value>;
    async fn post(&self, path: &str, body: Value) -> IdmsResult<Value>;
    async fn patch(&self, path: &str, body: Value) -> IdmsResult<Value>;
    async fn delete(&self, path: &str) -> IdmsResult<Value>;
}
