//! Durable chat preferences.
//!
//! The active conversation id and the selected model survive restarts
//! so a new session resumes where the last one left off. This state is
//! independent of the credential: logging out does not forget which
//! conversation was open.

use crate::paths::TaskpilotPaths;
use crate::storage::{AtomicTomlFile, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// The model used when the user has never picked one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Models the assistant endpoint accepts.
pub const AVAILABLE_MODELS: [&str; 3] = [
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
];

/// The persisted preference record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPrefs {
    /// The conversation to resume on startup, if any.
    #[serde(default)]
    pub active_conversation_id: Option<i64>,
    /// The model to send chat turns with.
    #[serde(default = "default_model")]
    pub selected_model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ChatPrefs {
    fn default() -> Self {
        Self {
            active_conversation_id: None,
            selected_model: default_model(),
        }
    }
}

/// Reads and writes chat preferences, caching them in memory so the
/// file is only touched on mutation.
#[derive(Clone)]
pub struct ChatStateStore {
    prefs: Arc<Mutex<ChatPrefs>>,
    file: Arc<AtomicTomlFile<ChatPrefs>>,
}

impl ChatStateStore {
    /// Creates a store and restores persisted preferences. A missing
    /// or unreadable file falls back to defaults.
    pub fn new(paths: &TaskpilotPaths) -> Self {
        let file = AtomicTomlFile::new(paths.chat_state_file());
        let initial = match file.load() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => ChatPrefs::default(),
            Err(e) => {
                tracing::warn!("failed to read chat state, using defaults: {e}");
                ChatPrefs::default()
            }
        };
        Self {
            prefs: Arc::new(Mutex::new(initial)),
            file: Arc::new(file),
        }
    }

    fn persist(&self, prefs: &ChatPrefs) -> Result<(), StorageError> {
        self.file.save(prefs)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatPrefs> {
        // A poisoned lock means a writer panicked mid-update; the cached
        // prefs themselves are still plain data, so keep going.
        self.prefs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The conversation to resume, if one is persisted.
    pub fn active_conversation(&self) -> Option<i64> {
        self.lock().active_conversation_id
    }

    /// Persists a new active conversation id.
    pub fn set_active_conversation(&self, conversation_id: i64) -> Result<(), StorageError> {
        let mut prefs = self.lock();
        prefs.active_conversation_id = Some(conversation_id);
        self.persist(&prefs)
    }

    /// Forgets the active conversation (the "new conversation" state).
    pub fn clear_active_conversation(&self) -> Result<(), StorageError> {
        let mut prefs = self.lock();
        prefs.active_conversation_id = None;
        self.persist(&prefs)
    }

    /// The model chat turns are sent with.
    pub fn selected_model(&self) -> String {
        self.lock().selected_model.clone()
    }

    /// Persists a new model selection.
    pub fn set_selected_model(&self, model: impl Into<String>) -> Result<(), StorageError> {
        let mut prefs = self.lock();
        prefs.selected_model = model.into();
        self.persist(&prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_on_fresh_store() {
        let dir = TempDir::new().unwrap();
        let store = ChatStateStore::new(&TaskpilotPaths::with_root(dir.path()));
        assert!(store.active_conversation().is_none());
        assert_eq!(store.selected_model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_state_survives_reload() {
        let dir = TempDir::new().unwrap();
        let paths = TaskpilotPaths::with_root(dir.path());

        let store = ChatStateStore::new(&paths);
        store.set_active_conversation(17).unwrap();
        store.set_selected_model("gemini-2.0-flash").unwrap();

        // Simulated restart: a fresh store over the same directory
        let restored = ChatStateStore::new(&paths);
        assert_eq!(restored.active_conversation(), Some(17));
        assert_eq!(restored.selected_model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_clear_active_conversation() {
        let dir = TempDir::new().unwrap();
        let paths = TaskpilotPaths::with_root(dir.path());

        let store = ChatStateStore::new(&paths);
        store.set_active_conversation(3).unwrap();
        store.clear_active_conversation().unwrap();
        assert!(store.active_conversation().is_none());

        // The model choice is untouched by conversation resets
        assert_eq!(store.selected_model(), DEFAULT_MODEL);
    }
}
