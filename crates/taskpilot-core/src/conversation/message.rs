//! Chat transcript message types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed (or synthesized on behalf of) the user.
    User,
    /// Message produced by the assistant, including error entries
    /// the client appends so the transcript stays a readable log.
    Assistant,
}

/// A single message in the chat transcript.
///
/// Transcript state is ephemeral: it lives in the active view and is
/// reloaded wholesale from the backend when switching conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Local or server-assigned identifier. Server messages keep their
    /// numeric id rendered as a string; locally appended messages get
    /// a fresh UUID.
    pub id: String,
    /// Who authored the message.
    pub role: MessageRole,
    /// The message text.
    pub content: String,
}

impl Message {
    /// Creates a locally authored user message with a fresh id.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates a locally appended assistant message with a fresh id.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_messages_get_unique_ids() {
        let a = Message::user("hello");
        let b = Message::user("hello");
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, MessageRole::User);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            r#""assistant""#
        );
    }
}
