//! Persistent bearer-credential storage.
//!
//! The credential is the only durable resource shared across
//! components: every gateway call reads it, login/logout mutate it.
//! It is stored with a fixed 7-day expiry window; an expired record
//! reads as absent.

use crate::paths::TaskpilotPaths;
use crate::storage::{AtomicTomlFile, StorageError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use taskpilot_core::auth::decode_claims;

/// How long a stored credential stays valid.
const CREDENTIAL_TTL_DAYS: i64 = 7;

/// The persisted credential record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredCredential {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Stores and retrieves the bearer credential.
///
/// There is at most one live credential per config directory. Reads
/// and writes are synchronous; callers treat them as atomic.
#[derive(Clone)]
pub struct TokenStore {
    file: std::sync::Arc<AtomicTomlFile<StoredCredential>>,
}

impl TokenStore {
    /// Creates a store backed by the given paths.
    pub fn new(paths: &TaskpilotPaths) -> Self {
        Self {
            file: std::sync::Arc::new(AtomicTomlFile::new(paths.credentials_file())),
        }
    }

    /// Reads the persisted token.
    ///
    /// Returns `None` when no credential is stored, the record is
    /// unreadable, or the expiry window has passed. Read failures are
    /// logged and swallowed so callers only ever see presence/absence.
    pub fn get(&self) -> Option<String> {
        let record = match self.file.load() {
            Ok(record) => record?,
            Err(e) => {
                tracing::warn!("failed to read credential store: {e}");
                return None;
            }
        };
        if record.expires_at <= Utc::now() {
            return None;
        }
        Some(record.access_token)
    }

    /// Persists a token with the fixed 7-day expiry window.
    pub fn set(&self, token: impl Into<String>) -> Result<(), StorageError> {
        let record = StoredCredential {
            access_token: token.into(),
            expires_at: Utc::now() + Duration::days(CREDENTIAL_TTL_DAYS),
        };
        self.file.save(&record)
    }

    /// Removes the persisted token immediately.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.file.remove()
    }

    /// The numeric user id from the stored token's subject claim.
    pub fn subject_id(&self) -> Option<i64> {
        let token = self.get()?;
        decode_claims(&token)?.subject_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> TokenStore {
        TokenStore::new(&TaskpilotPaths::with_root(dir.path()))
    }

    fn token_for_subject(sub: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}","exp":1999999999}}"#).as_bytes());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let token = token_for_subject("42");
        store.set(&token).unwrap();
        assert_eq!(store.get(), Some(token));
        assert_eq!(store.subject_id(), Some(42));
    }

    #[test]
    fn test_clear_makes_token_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set("some-token").unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
        // Clearing an already-empty store is fine
        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_expired_record_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let expired = StoredCredential {
            access_token: "stale".into(),
            expires_at: Utc::now() - Duration::hours(1),
        };
        store.file.save(&expired).unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_get_on_empty_store() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).get().is_none());
    }
}
