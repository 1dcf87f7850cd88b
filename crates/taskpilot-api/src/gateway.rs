//! Authenticated request dispatch and failure classification.
//!
//! `ApiGateway` is the single translation point from transport status
//! codes to the [`ApiError`] taxonomy. Everything above it receives
//! classified failures, never raw status codes.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::env;
use taskpilot_core::error::{ApiError, Result};
use taskpilot_infrastructure::TokenStore;

/// Backend origin used when no override is configured.
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Environment variable overriding the backend origin.
const BASE_URL_ENV: &str = "TASKPILOT_API_URL";

/// Issues authenticated HTTP calls against the backend.
///
/// Every call reads the credential from the [`TokenStore`] and, when
/// present, attaches it as a bearer header. A 401 response clears the
/// stored credential before the failure is returned, so no further
/// call is attempted with the stale token.
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiGateway {
    /// Creates a gateway for an explicit backend origin.
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Creates a gateway using `TASKPILOT_API_URL`, falling back to
    /// the default local backend.
    pub fn from_env(tokens: TokenStore) -> Self {
        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, tokens)
    }

    /// The credential store this gateway reads from.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Dispatches a request and deserializes the JSON response body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let response_body = self.dispatch(method, path, body).await?;
        serde_json::from_str(&response_body)
            .map_err(|e| ApiError::unknown(format!("unexpected response shape: {e}")))
    }

    /// Dispatches a request and discards any response body.
    pub async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<()> {
        self.dispatch(method, path, body).await.map(|_| ())
    }

    async fn dispatch(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);

        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            // Sets the JSON content type as a side effect
            request = request.json(body);
        }

        tracing::debug!(%method, %url, "dispatching request");

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::unknown(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            return Ok(text);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Err(e) = self.tokens.clear() {
                tracing::warn!("failed to clear credential after 401: {e}");
            }
        }

        tracing::debug!(status = status.as_u16(), "request rejected");
        Err(classify_failure(status, &text))
    }
}

/// Classifies a non-2xx response into the error taxonomy.
///
/// The `detail` field of the body supplies the message where it is
/// safe to surface; 5xx bodies are never carried through.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::forbidden(
            extract_detail(body)
                .unwrap_or_else(|| "You do not have permission to perform this action".into()),
        ),
        StatusCode::NOT_FOUND => {
            ApiError::not_found(extract_detail(body).unwrap_or_else(|| "Not found".into()))
        }
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::validation(
            extract_validation_detail(body).unwrap_or_else(|| "Invalid request".into()),
        ),
        s if s.is_server_error() => ApiError::Server,
        s => ApiError::unknown(
            extract_detail(body)
                .or_else(|| s.canonical_reason().map(String::from))
                .unwrap_or_else(|| format!("HTTP {}", s.as_u16())),
        ),
    }
}

/// Pulls a string `detail` field out of an error body, if present.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(String::from)
}

/// Pulls the `detail` of a 422 body. FastAPI renders validation
/// failures as a list of `{loc, msg, type}` entries; their messages
/// are joined with a comma. A plain-string detail passes through.
fn extract_validation_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join(", "))
            }
        }
        _ => None,
    }
}
