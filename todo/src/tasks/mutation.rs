//! Builders for the requests sent to the store.
//!
//! Titles are validated here before anything leaves the client. Everything
//! else is checked by the store, whose verdict comes back as a
//! [`MutationFailure`](todo_proto::task::MutationFailure).

use todo_proto::task::{Mutation, NewTask, Task, TaskId, TaskPatch};

use super::TaskError;

/// Trims `raw` and checks it against `max_len` characters.
///
/// # Errors
///
/// Returns [`TaskError::TitleEmpty`] or [`TaskError::TitleTooLong`].
pub fn validate_title(raw: &str, max_len: usize) -> Result<String, TaskError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > max_len {
        return Err(TaskError::TitleTooLong { max: max_len });
    }
    Ok(title.to_string())
}

/// Builds a create request for a new, incomplete task.
///
/// # Errors
///
/// Propagates title validation errors.
pub fn create_task(raw: &str, max_len: usize) -> Result<Mutation, TaskError> {
    let title = validate_title(raw, max_len)?;
    Ok(Mutation::Create(NewTask::titled(title)))
}

/// Builds an update that flips the completed flag, resending the title.
#[must_use]
pub fn toggle_task(task: &Task) -> Mutation {
    Mutation::Update {
        id: task.id.clone(),
        patch: TaskPatch {
            title: Some(task.title.clone()),
            completed: Some(!task.completed),
            description: None,
        },
    }
}

#[must_use]
pub fn delete_task(id: &TaskId) -> Mutation {
    Mutation::Delete { id: id.clone() }
}

#[must_use]
pub const fn clear_completed() -> Mutation {
    Mutation::ClearCompleted
}
