//! Typed task CRUD over the gateway.

use crate::gateway::ApiGateway;
use async_trait::async_trait;
use reqwest::Method;
use taskpilot_core::error::{ApiError, Result};
use taskpilot_core::gateway::TaskGateway;
use taskpilot_core::task::{Task, TaskCreate, TaskUpdate};

/// Reqwest-backed implementation of [`TaskGateway`].
///
/// Create and update run the client-side validation first; violations
/// never reach the network.
#[derive(Clone)]
pub struct TaskApi {
    gateway: ApiGateway,
}

impl TaskApi {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value)
            .map_err(|e| ApiError::unknown(format!("failed to encode request body: {e}")))
    }
}

#[async_trait]
impl TaskGateway for TaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.gateway.request(Method::GET, "/tasks", None).await
    }

    async fn create_task(&self, draft: &TaskCreate) -> Result<Task> {
        draft.validate()?;
        let body = Self::to_body(draft)?;
        self.gateway
            .request(Method::POST, "/tasks", Some(&body))
            .await
    }

    async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<Task> {
        update.validate()?;
        let body = Self::to_body(update)?;
        self.gateway
            .request(Method::PATCH, &format!("/tasks/{task_id}"), Some(&body))
            .await
    }

    async fn toggle_task(&self, task_id: i64) -> Result<Task> {
        self.gateway
            .request(Method::PATCH, &format!("/tasks/{task_id}/toggle"), None)
            .await
    }

    async fn delete_task(&self, task_id: i64) -> Result<()> {
        self.gateway
            .request_empty(Method::DELETE, &format!("/tasks/{task_id}"), None)
            .await
    }
}
