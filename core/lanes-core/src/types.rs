//! Shared identity and status types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::{LanesError, Result};

/// Stable identifier for a workspace.
///
/// Survives terminal create/destroy. It doubles as the leading segment of
/// every marker filename, so it must be usable as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Validates and wraps an id. Surrounding whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let id = raw.as_ref().trim();
        let reason = if id.is_empty() {
            Some("empty")
        } else if id.starts_with('.') {
            Some("leading '.'")
        } else if id.contains('/') || id.contains('\\') {
            Some("path separator")
        } else if id.chars().any(char::is_control) {
            Some("control character")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(LanesError::InvalidWorkspaceId {
                id: id.to_string(),
                reason,
            }),
            None => Ok(WorkspaceId(id.to_string())),
        }
    }

    /// Mints a fresh id for a newly created workspace.
    pub fn generate() -> Self {
        WorkspaceId(ulid::Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = LanesError;

    fn from_str(s: &str) -> Result<Self> {
        WorkspaceId::new(s)
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = LanesError;

    fn try_from(value: String) -> Result<Self> {
        WorkspaceId::new(value)
    }
}

impl From<WorkspaceId> for String {
    fn from(id: WorkspaceId) -> String {
        id.0
    }
}

impl Borrow<str> for WorkspaceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Marker-derived status of a workspace as of one poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Active,
    Idle,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityStatus::Active => write!(f, "active"),
            ActivityStatus::Idle => write!(f, "idle"),
        }
    }
}
