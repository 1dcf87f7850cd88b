//! Path management for taskpilot's durable local state.
//!
//! Everything the client persists lives in one config directory:
//!
//! ```text
//! ~/.config/taskpilot/
//! ├── credentials.toml    # bearer credential (TokenStore)
//! └── chat_state.toml     # active conversation id + selected model
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// The platform config directory could not be determined.
    #[error("cannot find a config directory for this platform")]
    ConfigDirNotFound,
}

/// Resolves the locations of taskpilot's state files.
///
/// Tests point this at a temp directory via [`TaskpilotPaths::with_root`].
#[derive(Debug, Clone)]
pub struct TaskpilotPaths {
    root: PathBuf,
}

impl TaskpilotPaths {
    /// Uses the platform config directory (`~/.config/taskpilot` on
    /// Linux).
    pub fn new() -> Result<Self, PathError> {
        let base = dirs::config_dir().ok_or(PathError::ConfigDirNotFound)?;
        Ok(Self {
            root: base.join("taskpilot"),
        })
    }

    /// Uses an explicit root directory instead of the platform default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The config directory itself.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Location of the persisted bearer credential.
    pub fn credentials_file(&self) -> PathBuf {
        self.root.join("credentials.toml")
    }

    /// Location of the persisted chat preferences.
    pub fn chat_state_file(&self) -> PathBuf {
        self.root.join("chat_state.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_under_root() {
        let paths = TaskpilotPaths::with_root("/tmp/tp-test");
        assert_eq!(
            paths.credentials_file(),
            PathBuf::from("/tmp/tp-test/credentials.toml")
        );
        assert_eq!(
            paths.chat_state_file(),
            PathBuf::from("/tmp/tp-test/chat_state.toml")
        );
    }
}
