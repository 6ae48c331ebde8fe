//! User entity and request payload types.
//!
//! A user owns a `pending_tasks` set: the ids of tasks currently assigned to
//! it that are not yet completed. The set is maintained by the server-side
//! reconciler; requested ids in create/replace payloads are filtered against
//! the task store before being persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::TaskId;

/// Unique identifier for a user, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new time-ordered user identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A stored user document.
///
/// `pending_tasks` is a set (no duplicates, order irrelevant) stored as a
/// `Vec` for stable JSON output. `email` is unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name, copied into `assignedUserName` on owned tasks.
    pub name: String,
    /// Email address, unique across all users.
    pub email: String,
    /// Ids of tasks assigned to this user and not yet completed.
    #[serde(rename = "pendingTasks")]
    pub pending_tasks: Vec<TaskId>,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(rename = "dateCreated")]
    pub date_created: u64,
}

impl User {
    /// Returns `true` if the given task id is in this user's pending set.
    #[must_use]
    pub fn has_pending(&self, task_id: TaskId) -> bool {
        self.pending_tasks.contains(&task_id)
    }
}

/// Incoming JSON payload for user create and replace requests.
///
/// `pending_tasks` entries are raw strings; entries that do not parse as ids
/// or do not name an existing, not-completed task are dropped silently
/// during reconciliation (deliberate policy, not a validation error).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDraft {
    /// Display name (required).
    pub name: Option<String>,
    /// Email address (required, unique).
    pub email: Option<String>,
    /// Requested pending task ids.
    #[serde(rename = "pendingTasks")]
    pub pending_tasks: Option<Vec<String>>,
}
