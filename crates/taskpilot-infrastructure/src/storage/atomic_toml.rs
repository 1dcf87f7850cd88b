//! Atomic TOML file persistence.
//!
//! Small state files are written through a temp file + fsync + rename
//! sequence so a crash never leaves a half-written file behind, with
//! an advisory lock guarding concurrent writers.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during atomic TOML operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// File locking error.
    #[error("lock error: {0}")]
    Lock(String),
}

/// A handle to a TOML file with atomic write semantics.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a handle for the given path. The file itself is created
    /// lazily on first save.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    /// Loads and deserializes the file.
    ///
    /// A missing or empty file reads as `None`.
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(toml::from_str(&content)?))
    }

    /// Serializes and writes the data atomically.
    pub fn save(&self, data: &T) -> Result<(), StorageError> {
        let _lock = FileLock::acquire(&self.path)?;

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let rendered = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(rendered.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Removes the file. Removing a file that does not exist is not an
    /// error.
    pub fn remove(&self) -> Result<(), StorageError> {
        let _lock = FileLock::acquire(&self.path)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, StorageError> {
        let parent = self.path.parent().ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no parent directory",
            ))
        })?;
        let file_name = self.path.file_name().ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Advisory lock released on drop.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StorageError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| StorageError::Lock(format!("failed to acquire lock: {e}")))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the handle drops; removal is best effort
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestState {
        name: String,
        count: u32,
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<TestState>::new(dir.path().join("state.toml"));

        let state = TestState {
            name: "tp".into(),
            count: 3,
        };
        file.save(&state).unwrap();
        assert_eq!(file.load().unwrap().unwrap(), state);
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<TestState>::new(dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<TestState>::new(dir.path().join("state.toml"));
        file.save(&TestState {
            name: "tp".into(),
            count: 1,
        })
        .unwrap();

        file.remove().unwrap();
        assert!(file.load().unwrap().is_none());
        // Second remove is a no-op
        file.remove().unwrap();
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        let file = AtomicTomlFile::<TestState>::new(path.clone());
        file.save(&TestState {
            name: "tp".into(),
            count: 9,
        })
        .unwrap();

        assert!(path.exists());
        assert!(!dir.path().join(".state.toml.tmp").exists());
    }
}
