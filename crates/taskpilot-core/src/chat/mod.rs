//! Chat workflow types: intent detection and mode state machine.

pub mod intent;
pub mod mode;

pub use intent::{PendingDelete, detect_destructive_intent, extract_task_id, suggests_delete};
pub use mode::ChatMode;

/// Maximum chat message length accepted by the backend.
pub const CHAT_MESSAGE_MAX_LEN: usize = 1000;

use crate::error::{ApiError, Result};

/// Validates a chat message before dispatch: non-empty after trimming
/// and within the backend's length bound.
pub fn validate_chat_message(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ApiError::validation("Message cannot be empty"));
    }
    if content.chars().count() > CHAT_MESSAGE_MAX_LEN {
        return Err(ApiError::validation(format!(
            "Message must be {CHAT_MESSAGE_MAX_LEN} characters or less"
        )));
    }
    Ok(())
}
