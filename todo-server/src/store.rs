//! In-memory task store with a live query feed.
//!
//! The [`TaskStore`] is the authoritative task collection. Every mutation
//! that changes state re-publishes the whole collection on a
//! [`tokio::sync::watch`] channel; subscribers always see the latest full
//! snapshot and never a delta. Rejected mutations publish nothing.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{RwLock, watch};

use todo_proto::task::{
    MAX_TITLE_LENGTH, Mutation, MutationFailure, MutationOutcome, NewTask, Task, TaskId,
    TaskPatch,
};

/// Errors returned by store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The request carried invalid data (e.g. a blank title).
    #[error("invalid task: {0}")]
    Validation(String),
    /// No task has this id.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The update would not change any field.
    #[error("no fields to update")]
    NoOp,
}

impl From<StoreError> for MutationFailure {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(reason) => Self::Validation(reason),
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::NoOp => Self::NoOp,
        }
    }
}

/// Authoritative task collection, kept in creation order.
pub struct TaskStore {
    tasks: RwLock<Vec<Task>>,
    feed: watch::Sender<Vec<Task>>,
    max_title_len: usize,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Creates an empty store with the default title length limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_title_len(MAX_TITLE_LENGTH)
    }

    /// Creates an empty store with a custom title length limit.
    #[must_use]
    pub fn with_max_title_len(max_title_len: usize) -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            tasks: RwLock::new(Vec::new()),
            feed,
            max_title_len,
        }
    }

    /// Subscribes to the live feed. The receiver starts at the current snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.feed.subscribe()
    }

    /// Returns the current collection.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Inserts a new task and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the trimmed title is empty or too long.
    pub async fn create(&self, new_task: NewTask) -> Result<TaskId, StoreError> {
        let title = self.clean_title(&new_task.title)?;
        let task = Task {
            id: TaskId::new(),
            title,
            completed: new_task.completed,
            description: new_task.description,
            created_at: now_ms(),
        };
        let id = task.id.clone();

        let mut tasks = self.tasks.write().await;
        tasks.push(task);
        self.publish(&tasks);
        drop(tasks);

        tracing::debug!(task_id = %id, "task created");
        Ok(id)
    }

    /// Applies a patch to an existing task and returns the updated task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id,
    /// [`StoreError::Validation`] for an invalid title, and
    /// [`StoreError::NoOp`] if no field would change.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        // A missing id wins over a bad title.
        let title = patch
            .title
            .as_deref()
            .map(|raw| self.clean_title(raw))
            .transpose()?;

        let mut changed = false;
        if let Some(title) = title
            && title != task.title
        {
            task.title = title;
            changed = true;
        }
        if let Some(completed) = patch.completed
            && completed != task.completed
        {
            task.completed = completed;
            changed = true;
        }
        if let Some(description) = patch.description
            && task.description.as_ref() != Some(&description)
        {
            task.description = Some(description);
            changed = true;
        }
        if !changed {
            return Err(StoreError::NoOp);
        }

        let updated = task.clone();
        self.publish(&tasks);
        drop(tasks);

        tracing::debug!(task_id = %id, completed = updated.completed, "task updated");
        Ok(updated)
    }

    /// Removes a task. Returns whether it existed; an absent id is not an error.
    pub async fn delete(&self, id: &TaskId) -> bool {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        let existed = tasks.len() != before;
        if existed {
            self.publish(&tasks);
        }
        drop(tasks);

        tracing::debug!(task_id = %id, existed, "task deleted");
        existed
    }

    /// Removes every completed task and returns how many were removed.
    pub async fn clear_completed(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| !t.completed);
        let removed = before - tasks.len();
        if removed > 0 {
            self.publish(&tasks);
        }
        drop(tasks);

        tracing::debug!(removed, "completed tasks cleared");
        removed
    }

    /// Applies a wire-level [`Mutation`].
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub async fn apply(&self, mutation: Mutation) -> Result<MutationOutcome, StoreError> {
        match mutation {
            Mutation::Create(new_task) => self.create(new_task).await.map(MutationOutcome::Created),
            Mutation::Update { id, patch } => {
                self.update(&id, patch).await.map(MutationOutcome::Updated)
            }
            Mutation::Delete { id } => Ok(MutationOutcome::Deleted {
                existed: self.delete(&id).await,
            }),
            Mutation::ClearCompleted => {
                let removed = self.clear_completed().await;
                Ok(MutationOutcome::Cleared(
                    u32::try_from(removed).unwrap_or(u32::MAX),
                ))
            }
        }
    }

    /// Trims and validates a title.
    fn clean_title(&self, raw: &str) -> Result<String, StoreError> {
        let title = raw.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("title cannot be empty".to_string()));
        }
        if title.chars().count() > self.max_title_len {
            return Err(StoreError::Validation(format!(
                "title too long (max {} characters)",
                self.max_title_len
            )));
        }
        Ok(title.to_string())
    }

    fn publish(&self, tasks: &[Task]) {
        self.feed.send_replace(tasks.to_vec());
    }
}

/// Returns the current timestamp in milliseconds since epoch.
fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}
