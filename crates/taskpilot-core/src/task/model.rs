//! Task domain model.
//!
//! Contains the task entity as served by the backend, the request
//! payloads for creating and updating tasks, and the client-side
//! validation that runs before any network dispatch.

use crate::error::{ApiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum task title length, matching the backend schema.
pub const TITLE_MAX_LEN: usize = 200;

/// Maximum task description length, matching the backend schema.
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// Task priority as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ApiError::validation(format!(
                "unknown priority '{other}', expected low, medium, or high"
            ))),
        }
    }
}

/// A task as returned by the backend.
///
/// The id and all timestamps are server-assigned; the client never
/// fabricates them. The client holds a transient cached copy per
/// loaded view and replaces it wholesale from responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier, immutable.
    pub id: i64,
    /// Owning user id.
    pub user_id: i64,
    /// Task title (1-200 characters).
    pub title: String,
    /// Optional description (up to 2000 characters).
    #[serde(default)]
    pub description: Option<String>,
    /// Task priority.
    #[serde(default)]
    pub priority: Priority,
    /// Whether the task is completed.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp, set server-side when a task is toggled done.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Payload for creating a task (POST /tasks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
}

impl TaskCreate {
    /// Creates a payload with the default (medium) priority.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::default(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Validates the payload without touching the network.
    ///
    /// Violations are reported as [`ApiError::Validation`] so callers
    /// handle them the same way as server-side rejections.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())
    }
}

/// Partial-update payload for a task (PATCH /tasks/{id}).
///
/// Fields left as `None` are omitted from the request body and stay
/// untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskUpdate {
    /// Validates the populated fields without touching the network.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_description(self.description.as_deref())
    }
}

/// Validates a task title: required after trimming, at most 200 chars.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ApiError::validation(format!(
            "Title must be {TITLE_MAX_LEN} characters or less"
        )));
    }
    Ok(())
}

/// Validates an optional task description: at most 2000 chars.
pub fn validate_description(description: Option<&str>) -> Result<()> {
    if let Some(description) = description {
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(ApiError::validation(format!(
                "Description must be {DESCRIPTION_MAX_LEN} characters or less"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_required_after_trim() {
        let err = validate_title("   ").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Title is required"));
    }

    #[test]
    fn test_title_length_bound() {
        assert!(validate_title(&"x".repeat(200)).is_ok());
        let err = validate_title(&"x".repeat(201)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_description_length_bound() {
        assert!(validate_description(Some(&"d".repeat(2000))).is_ok());
        assert!(validate_description(None).is_ok());
        let err = validate_description(Some(&"d".repeat(2001))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_create_payload_validation() {
        let draft = TaskCreate::new("buy milk").with_description("2 liters");
        assert!(draft.validate().is_ok());

        let draft = TaskCreate::new("");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_update_payload_skips_empty_fields() {
        let update = TaskUpdate {
            completed: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"completed":true}"#);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_priority_round_trip() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(
            serde_json::to_string(&Priority::Low).unwrap(),
            r#""low""#
        );
        assert!("urgent".parse::<Priority>().is_err());
    }
}
