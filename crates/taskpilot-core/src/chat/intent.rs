//! Destructive-intent detection for chat input.
//!
//! Free-text commands that look like a task deletion are intercepted
//! before they reach the assistant, so the user has to confirm first.
//! The heuristic is deliberately the same one the product shipped
//! with: keyword containment plus a loose numeric task-id scan. It can
//! misfire on unrelated numbers; a structured command grammar or
//! confirmation driven by the backend's own tool calls would be
//! stricter, but compatibility wins here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Phrases that mark a message as a potential delete command.
const DESTRUCTIVE_PHRASES: [&str; 4] = ["delete", "remove", "cancel", "get rid of"];

static TASK_ID_RE: Lazy<Regex> = Lazy::new(|| {
    // "task 42", case-insensitive
    Regex::new(r"(?i)task\s+(\d+)").expect("task id pattern is valid")
});

static BARE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    // first standalone 1-3 digit number
    Regex::new(r"\b(\d{1,3})\b").expect("bare number pattern is valid")
});

/// A delete command waiting for explicit user confirmation.
///
/// At most one exists at a time; a newly detected intent replaces any
/// outstanding one. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelete {
    /// Id of the message that triggered the gate.
    pub message_id: String,
    /// The task the user appears to want deleted.
    pub task_id: u32,
    /// Display label, e.g. "Task 42".
    pub task_label: String,
}

impl PendingDelete {
    /// Creates a pending record for the given task id.
    pub fn new(message_id: impl Into<String>, task_id: u32) -> Self {
        Self {
            message_id: message_id.into(),
            task_id,
            task_label: format!("Task {task_id}"),
        }
    }
}

/// Returns true when the message text suggests a delete operation.
pub fn suggests_delete(content: &str) -> bool {
    let lower = content.to_lowercase();
    DESTRUCTIVE_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// Extracts a candidate task id from the message text.
///
/// Prefers an explicit "task <digits>" reference; otherwise takes the
/// first standalone 1-3 digit number. Returns `None` when neither
/// pattern matches, in which case the message is sent through ungated.
pub fn extract_task_id(content: &str) -> Option<u32> {
    if let Some(caps) = TASK_ID_RE.captures(content) {
        if let Ok(id) = caps[1].parse() {
            return Some(id);
        }
    }
    BARE_NUMBER_RE
        .captures(content)
        .and_then(|caps| caps[1].parse().ok())
}

/// Detects a destructive intent with an extractable task id.
///
/// Id 0 counts as no id; the backend never assigns it.
pub fn detect_destructive_intent(content: &str) -> Option<u32> {
    if suggests_delete(content) {
        extract_task_id(content).filter(|&id| id != 0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_delete_with_explicit_task_reference() {
        assert_eq!(detect_destructive_intent("please delete task 42"), Some(42));
        assert_eq!(detect_destructive_intent("Task 7 please remove"), Some(7));
    }

    #[test]
    fn test_intent_without_id_passes_through() {
        assert!(suggests_delete("delete it"));
        assert_eq!(detect_destructive_intent("delete it"), None);
    }

    #[test]
    fn test_task_zero_counts_as_no_id() {
        assert_eq!(detect_destructive_intent("delete task 0"), None);
        assert_eq!(detect_destructive_intent("remove 0"), None);
    }

    #[test]
    fn test_non_destructive_text_is_ignored() {
        assert_eq!(detect_destructive_intent("add task: buy milk"), None);
        assert!(!suggests_delete("show my tasks"));
    }

    #[test]
    fn test_bare_number_fallback() {
        assert_eq!(detect_destructive_intent("get rid of 13"), Some(13));
        // 4-digit numbers are not treated as task ids
        assert_eq!(extract_task_id("remove 2024 entries"), None);
    }

    #[test]
    fn test_explicit_reference_wins_over_bare_number() {
        assert_eq!(extract_task_id("remove 3 items from task 42"), Some(42));
    }

    #[test]
    fn test_case_insensitive_phrases() {
        assert!(suggests_delete("CANCEL task 5"));
        assert!(suggests_delete("please Get Rid Of task 5"));
    }

    #[test]
    fn test_pending_delete_label() {
        let pending = PendingDelete::new("m-1", 42);
        assert_eq!(pending.task_label, "Task 42");
    }
}
