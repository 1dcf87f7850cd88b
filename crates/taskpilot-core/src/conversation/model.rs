//! Conversation summary model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation as listed by `GET /conversations`.
///
/// The backend orders summaries most-recently-updated first; the
/// client preserves that order and never re-sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Server-assigned identifier.
    pub id: i64,
    /// Optional human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Content of the most recent message, if any.
    #[serde(default)]
    pub last_message: Option<String>,
    /// Total number of messages in the conversation.
    pub message_count: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ConversationSummary {
    /// Returns the display label: the title, or a preview of the last
    /// message, or a placeholder for an empty conversation.
    pub fn display_label(&self) -> String {
        if let Some(title) = &self.title {
            if !title.trim().is_empty() {
                return title.clone();
            }
        }
        match &self.last_message {
            Some(preview) => {
                let mut label: String = preview.chars().take(40).collect();
                if preview.chars().count() > 40 {
                    label.push('…');
                }
                label
            }
            None => format!("Conversation {}", self.id),
        }
    }
}
