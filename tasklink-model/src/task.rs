//! Task entity and request payload types.
//!
//! A task is a single unit of work with a deadline. It may be assigned to at
//! most one user; the `assigned_user_name` field is a denormalized copy of
//! that user's name, maintained by the server-side reconciler and never
//! trusted from client input.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Sentinel value for `assigned_user_name` when a task has no assignee.
pub const UNASSIGNED: &str = "unassigned";

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
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

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A stored task document.
///
/// `id` and `date_created` are assigned at creation and immutable; a full
/// replace preserves them. Field names on the wire follow the original API
/// (`assignedUser`, `assignedUserName`, `dateCreated`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Task name.
    pub name: String,
    /// Free-form description; empty string when not provided.
    pub description: String,
    /// Deadline as milliseconds since the Unix epoch.
    pub deadline: u64,
    /// Whether the task has been completed.
    pub completed: bool,
    /// The user this task is assigned to, if any.
    #[serde(rename = "assignedUser")]
    pub assigned_user: Option<UserId>,
    /// Denormalized name of the assigned user; [`UNASSIGNED`] when none.
    #[serde(rename = "assignedUserName")]
    pub assigned_user_name: String,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(rename = "dateCreated")]
    pub date_created: u64,
}

impl Task {
    /// Returns `true` when the task counts toward a user's pending set:
    /// assigned and not completed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.assigned_user.is_some() && !self.completed
    }
}

/// Incoming JSON payload for task create and replace requests.
///
/// All fields are optional at the serde level so that required-field checks
/// can produce precise validation errors; unknown fields are rejected.
/// `assigned_user` is the raw string from the client — either a user id, the
/// literal `"unassigned"`, or absent. A client-supplied `assignedUserName`
/// is accepted for wire compatibility but ignored; the server recomputes it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDraft {
    /// Task name (required).
    pub name: Option<String>,
    /// Free-form description (optional).
    pub description: Option<String>,
    /// Deadline in milliseconds since the Unix epoch (required).
    pub deadline: Option<u64>,
    /// Completion flag; defaults to `false`.
    pub completed: Option<bool>,
    /// Requested assignee: a user id string or `"unassigned"`.
    #[serde(rename = "assignedUser")]
    pub assigned_user: Option<String>,
    /// Ignored; the denormalized name is always server-computed.
    #[serde(rename = "assignedUserName")]
    pub assigned_user_name: Option<String>,
}
