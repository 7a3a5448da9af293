//! REST client over `reqwest`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::{error_for_status, Backend, Query, TokenStore};
use crate::config::ApiConfig;
use crate::{IdmsError, IdmsResult};

/// Backend client that attaches `Authorization: Token <value>` to every request
/// and drops local credentials when the backend answers 401.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> IdmsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IdmsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match self.tokens.token() {
            Some(token) => builder.header(AUTHORIZATION, format!("Token {}", token)),
            None => builder,
        }
    }

    async fn send(&self, method: &str, path: &str, builder: RequestBuilder) -> IdmsResult<Value> {
        debug!(method, path, "backend request");

        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| IdmsError::Network(format!("Backend unreachable: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdmsError::Network(format!("Failed to read response: {}", e)))?;

        let body = parse_body(&text);
        if status.is_success() {
            return Ok(body);
        }

        if status.as_u16() == 401 {
            warn!(path, "token rejected; clearing stored credentials");
            self.tokens.clear();
        }
        Err(error_for_status(status.as_u16(), &body))
    }
}

/// Empty bodies become `null`; non-JSON bodies are kept as a string so the
/// error normalizer can still surface them.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get(&self, path: &str, query: &Query) -> IdmsResult<Value> {
        let builder = self.client.get(self.url(path)).query(query);
        self.send("GET", path, builder).await
    }

    async fn post(&self, path: &str, body: Value) -> IdmsResult<Value> {
        let builder = self.client.post(self.url(path)).json(&body);
        self.send("POST", path, builder).await
    }

    async fn patch(&self, path: &str, body: Value) -> IdmsResult<Value> {
        let builder = self.client.patch(self.url(path)).json(&body);
        self.send("PATCH", path, builder).await
    }

    async fn delete(&self, path: &str) -> IdmsResult<Value> {
        let builder = self.client.delete(self.url(path));
        self.send("DELETE", path, builder).await
    }
}
