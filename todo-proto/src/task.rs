//! Task model and mutation vocabulary.
//!
//! A [`Task`] is the authoritative record held by the store. It carries no
//! ordering field: the order in which a snapshot lists tasks is whatever the
//! store chooses, and clients must not depend on it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Unique identifier for a task, based on UUID v7.
///
/// Assigned by the store on creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

/// A task as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Non-empty, trimmed title.
    pub title: String,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Free-form description. Accepted by the store, not shown by the client.
    pub description: Option<String>,
    /// When the store created this task (milliseconds since epoch).
    pub created_at: u64,
}

/// Arguments for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Title as typed; the store trims it.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Initial completion flag.
    pub completed: bool,
}

impl NewTask {
    /// A new, incomplete task with no description.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
        }
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement completion flag.
    pub completed: Option<bool>,
    /// Replacement description.
    pub description: Option<String>,
}

impl TaskPatch {
    /// Returns `true` if the patch carries no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.description.is_none()
    }
}

/// A request to change remote state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert a new task.
    Create(NewTask),
    /// Patch an existing task.
    Update {
        /// Target task.
        id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Remove a task. Removing an absent id is not an error.
    Delete {
        /// Target task.
        id: TaskId,
    },
    /// Remove every completed task.
    ClearCompleted,
}

/// Successful result of a [`Mutation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationOutcome {
    /// A task was inserted with this id.
    Created(TaskId),
    /// The task after the patch was applied.
    Updated(Task),
    /// Delete finished; `existed` tells whether anything was removed.
    Deleted {
        /// Whether the id was present before the delete.
        existed: bool,
    },
    /// Number of completed tasks removed.
    Cleared(u32),
}

/// Reason a [`Mutation`] was rejected by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MutationFailure {
    /// The target id is not present.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The update would not change any field.
    #[error("no fields to update")]
    NoOp,
    /// The request carried invalid data.
    #[error("invalid task: {0}")]
    Validation(String),
}
