//! Credential storage and the login/logout round trips

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::Backend;
use crate::{ActingUser, IdmsError, IdmsResult};

/// Where the auth token and cached user live between calls.
///
/// Browser builds back this with local storage; the crate ships an in-memory store.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn user(&self) -> Option<ActingUser>;
    fn store(&self, token: String, user: ActingUser);
    fn clear(&self);

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<(String, ActingUser)>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|(token, _)| token.clone())
    }

    fn user(&self) -> Option<ActingUser> {
        self.inner.read().as_ref().map(|(_, user)| user.clone())
    }

    fn store(&self, token: String, user: ActingUser) {
        *self.inner.write() = Some((token, user));
    }

    fn clear(&self) {
        *self.inner.write() = None;
    }
}

/// Body returned by `auth/login/`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: ActingUser,
}

/// Authenticate and cache the token and user on success
pub async fn login(
    backend: &dyn Backend,
    tokens: &dyn TokenStore,
    email: &str,
    password: &str,
) -> IdmsResult<ActingUser> {
    let body = backend
        .post("auth/login/", json!({ "email": email, "password": password }))
        .await?;
    let response: LoginResponse = super::decode_one(body)?;

    info!(user = %response.user.id, role = %response.user.role, "logged in");
    tokens.store(response.token, response.user.clone());
    Ok(response.user)
}

/// Tell the backend, then clear local credentials regardless of its answer
pub async fn logout(backend: &dyn Backend, tokens: &dyn TokenStore) {
    if let Err(err) = backend.post("auth/logout/", json!({})).await {
        warn!(error = %err, "logout call failed; clearing local credentials anyway");
    }
    tokens.clear();
}

/// The cached user, or `Unauthorized` when nobody is signed in
pub fn current_user(tokens: &dyn TokenStore) -> IdmsResult<ActingUser> {
    match (tokens.token(), tokens.user()) {
        (Some(_), Some(user)) => Ok(user),
        _ => Err(IdmsError::Unauthorized("not signed in".to_string())),
    }
}
