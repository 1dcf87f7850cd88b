//! Gateway traits at the network seam.
//!
//! The application layer talks to the backend through these traits so
//! the workflow logic can be exercised against mocks. The api crate
//! provides the reqwest-backed implementations.

use crate::conversation::{ConversationSummary, Message};
use crate::error::Result;
use crate::task::{Task, TaskCreate, TaskUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One tool invocation reported by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// The tool name, e.g. "add_task".
    pub tool: String,
    /// Outcome reported by the backend, e.g. "success".
    pub status: String,
    /// The task the tool acted on, when applicable.
    #[serde(default)]
    pub task_id: Option<i64>,
}

/// The assistant's reply to one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The conversation this turn was recorded under. For a turn sent
    /// without a conversation id, this is the newly created one.
    pub conversation_id: i64,
    /// The assistant's reply text.
    pub response: String,
    /// Tool invocations performed while producing the reply.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// Backend operations the chat workflow depends on.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Sends one chat turn to the assistant endpoint.
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<i64>,
        model: &str,
    ) -> Result<ChatResponse>;

    /// Lists conversation summaries, most-recently-updated first.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Loads the full transcript of one conversation, chronological.
    async fn conversation_messages(&self, conversation_id: i64) -> Result<Vec<Message>>;

    /// Deletes a conversation server-side.
    async fn delete_conversation(&self, conversation_id: i64) -> Result<()>;
}

/// Backend operations for the task list view.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Lists the current user's tasks.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Creates a task; the server assigns id and timestamps.
    async fn create_task(&self, draft: &TaskCreate) -> Result<Task>;

    /// Applies a partial update to a task.
    async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<Task>;

    /// Flips the completed flag; completion stamping is server-side.
    async fn toggle_task(&self, task_id: i64) -> Result<Task>;

    /// Deletes a task. Repeating a delete surfaces NotFound.
    async fn delete_task(&self, task_id: i64) -> Result<()>;
}
