//! Chat workflow modes.

use super::intent::PendingDelete;
use serde::{Deserialize, Serialize};

/// The current mode of the chat workflow.
///
/// The orchestrator moves between these states as input arrives:
/// destructive commands park in `AwaitingDeleteConfirmation` until the
/// user decides, and every dispatched turn passes through
/// `AwaitingAssistant` (success and failure both return to `Idle`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatMode {
    /// Waiting for user input.
    Idle,
    /// A turn is in flight; sending is disabled until it resolves.
    AwaitingAssistant,
    /// A destructive command was detected and needs confirmation.
    AwaitingDeleteConfirmation {
        /// The delete awaiting confirmation.
        pending: PendingDelete,
    },
}

impl ChatMode {
    /// Whether new input can currently be dispatched.
    pub fn accepts_input(&self) -> bool {
        !matches!(self, Self::AwaitingAssistant)
    }

    /// Returns the pending delete, if the gate is active.
    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        match self {
            Self::AwaitingDeleteConfirmation { pending } => Some(pending),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awaiting_assistant_blocks_input() {
        assert!(ChatMode::Idle.accepts_input());
        assert!(!ChatMode::AwaitingAssistant.accepts_input());
    }

    #[test]
    fn test_pending_delete_accessor() {
        let mode = ChatMode::AwaitingDeleteConfirmation {
            pending: PendingDelete::new("m-1", 42),
        };
        assert_eq!(mode.pending_delete().unwrap().task_id, 42);
        assert!(ChatMode::Idle.pending_delete().is_none());
    }
}
