//! Login, registration, and logout against the auth endpoints.

use crate::gateway::ApiGateway;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskpilot_core::error::Result;

/// Response body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// A registered account, as returned by `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// The small login/logout state machine over the gateway.
///
/// The session itself is derived state: authenticated means a live
/// credential is present in the token store, nothing more.
#[derive(Clone)]
pub struct SessionController {
    gateway: ApiGateway,
}

impl SessionController {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// Logs in and persists the returned credential.
    ///
    /// On failure the gateway's classified error is surfaced and the
    /// session stays anonymous.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = json!({ "email": email, "password": password });
        let auth: AuthResponse = self
            .gateway
            .request(Method::POST, "/auth/login", Some(&body))
            .await?;
        if let Err(e) = self.gateway.tokens().set(&auth.access_token) {
            tracing::warn!("failed to persist credential: {e}");
        }
        Ok(auth)
    }

    /// Creates an account. Does not log in; the session state is
    /// unchanged.
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let body = json!({ "email": email, "password": password });
        self.gateway
            .request(Method::POST, "/auth/register", Some(&body))
            .await
    }

    /// Logs out: notifies the backend best-effort, then always clears
    /// the local credential.
    pub async fn logout(&self) {
        if let Err(e) = self
            .gateway
            .request_empty(Method::POST, "/auth/logout", None)
            .await
        {
            tracing::debug!("logout notification failed: {e}");
        }
        if let Err(e) = self.gateway.tokens().clear() {
            tracing::warn!("failed to clear credential on logout: {e}");
        }
    }

    /// Whether a live credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.gateway.tokens().get().is_some()
    }
}
