//! Chat and conversation endpoints.

use crate::gateway::ApiGateway;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use taskpilot_core::conversation::{ConversationSummary, Message, MessageRole};
use taskpilot_core::error::{ApiError, Result};
use taskpilot_core::gateway::{ChatGateway, ChatResponse};

/// Request body of `POST /{user_id}/chat`.
#[derive(Debug, Clone, Serialize)]
struct ChatTurnRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// A transcript message as served by
/// `GET /conversations/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
struct MessageRead {
    id: i64,
    role: MessageRole,
    content: String,
}

impl From<MessageRead> for Message {
    fn from(wire: MessageRead) -> Self {
        Message {
            id: wire.id.to_string(),
            role: wire.role,
            content: wire.content,
        }
    }
}

/// Reqwest-backed implementation of [`ChatGateway`].
///
/// The chat endpoint is addressed per user; the user id is decoded
/// from the stored credential's subject claim at call time, so a
/// cleared credential fails as `Unauthorized` before any dispatch.
#[derive(Clone)]
pub struct ChatApi {
    gateway: ApiGateway,
}

impl ChatApi {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ChatGateway for ChatApi {
    async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<i64>,
        model: &str,
    ) -> Result<ChatResponse> {
        taskpilot_core::chat::validate_chat_message(message)?;

        let user_id = self
            .gateway
            .tokens()
            .subject_id()
            .ok_or(ApiError::Unauthorized)?;

        let request = ChatTurnRequest {
            message,
            conversation_id,
            model: Some(model),
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| ApiError::unknown(format!("failed to encode chat turn: {e}")))?;

        self.gateway
            .request(Method::POST, &format!("/{user_id}/chat"), Some(&body))
            .await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.gateway
            .request(Method::GET, "/conversations", None)
            .await
    }

    async fn conversation_messages(&self, conversation_id: i64) -> Result<Vec<Message>> {
        let wire: Vec<MessageRead> = self
            .gateway
            .request(
                Method::GET,
                &format!("/conversations/{conversation_id}/messages"),
                None,
            )
            .await?;
        Ok(wire.into_iter().map(Message::from).collect())
    }

    async fn delete_conversation(&self, conversation_id: i64) -> Result<()> {
        self.gateway
            .request_empty(
                Method::DELETE,
                &format!("/conversations/{conversation_id}"),
                None,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_request_omits_absent_fields() {
        let request = ChatTurnRequest {
            message: "hi",
            conversation_id: None,
            model: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"message":"hi"}"#
        );

        let request = ChatTurnRequest {
            message: "hi",
            conversation_id: Some(17),
            model: Some("gemini-2.5-flash"),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["conversation_id"], 17);
    }

    #[test]
    fn test_wire_message_keeps_numeric_id_as_string() {
        let wire = MessageRead {
            id: 5,
            role: MessageRole::Assistant,
            content: "done".into(),
        };
        let message = Message::from(wire);
        assert_eq!(message.id, "5");
        assert_eq!(message.role, MessageRole::Assistant);
    }
}
