//! In-memory [`Backend`] for exercising coordinators without a server

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::api::{Backend, Query};
use crate::{IdmsError, IdmsResult};

/// One call as the fake saw it
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub query: Query,
    pub body: Option<Value>,
}

/// Scripted backend: responses are queued per `(method, path)` and consumed
/// in order; the last queued response repeats once the queue drains.
#[derive(Debug, Default)]
pub struct FakeBackend {
    responses: Mutex<HashMap<(String, String), VecDeque<IdmsResult<Value>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, path: &str, response: IdmsResult<Value>) -> &Self {
        self.responses
            .lock()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    fn answer(&self, method: &'static str, path: &str, query: Query, body: Option<Value>) -> IdmsResult<Value> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            query,
            body,
        });

        let mut responses = self.responses.lock();
        let queue = responses
            .get_mut(&(method.to_string(), path.to_string()))
            .ok_or_else(|| IdmsError::NotFound(format!("no scripted response for {} {}", method, path)))?;

        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Err(IdmsError::Network("empty script".to_string())))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(IdmsError::Network("empty script".to_string())))
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get(&self, path: &str, query: &Query) -> IdmsResult<Value> {
        self.answer("GET", path, query.clone(), None)
    }

    async fn post(&self, path: &str, body: Value) -> IdmsResult<Value> {
        self.answer("POST", path, Vec::new(), Some(body))
    }

    async fn patch(&self, path: &str, body: Value) -> IdmsResult<Value> {
        self.answer("PATCH", path, Vec::new(), Some(body))
    }

    async fn delete(&self, path: &str) -> IdmsResult<Value> {
        self.answer("DELETE", path, Vec::new(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{auth, MemoryTokenStore, TokenStore};
    use crate::Role;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_stores_credentials() {
        let backend = FakeBackend::new();
        backend.respond(
            "POST",
            "auth/login/",
            Ok(json!({
                "token": "t-1",
                "user": {"id": 5, "email": "n@clinic.test", "role": {"id": 2, "name": "Nurse"}}
            })),
        );
        let tokens = MemoryTokenStore::new();

        let user = auth::login(&backend, &tokens, "n@clinic.test", "pw").await.unwrap();
        assert_eq!(user.role, Role::Nurse);
        assert_eq!(tokens.token().as_deref(), Some("t-1"));
        assert_eq!(
            backend.calls()[0].body,
            Some(json!({"email": "n@clinic.test", "password": "pw"}))
        );
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let backend = FakeBackend::new();
        backend.respond("POST", "auth/logout/", Err(IdmsError::Network("down".to_string())));
        let tokens = MemoryTokenStore::new();
        backend.respond(
            "POST",
            "auth/login/",
            Ok(json!({"token": "t-2", "user": {"id": 1, "role": "Admin"}})),
        );
        auth::login(&backend, &tokens, "a@x.test", "pw").await.unwrap();
        assert!(tokens.is_authenticated());

        auth::logout(&backend, &tokens).await;
        assert!(!tokens.is_authenticated());
    }

    #[tokio::test]
    async fn test_unscripted_path_is_not_found() {
        let backend = FakeBackend::new();
        let err = backend.get("users/", &Vec::new()).await.unwrap_err();
        assert!(matches!(err, IdmsError::NotFound(_)));
    }
}
