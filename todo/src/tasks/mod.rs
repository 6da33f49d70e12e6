//! Client-side task list: a locally ordered view over the remote feed.
//!
//! The remote store owns task data but has no notion of order. This module
//! keeps a user-controlled order on the client and reconciles it against
//! every snapshot the feed pushes: [`reconcile`] is the pure reducer,
//! [`OrderReconciler`] holds the current view plus the active [`Filter`],
//! and [`mutation`] builds the requests sent back to the store.

pub mod filter;
pub mod mutation;
pub mod reconcile;
pub mod view;

pub use filter::Filter;
pub use reconcile::{ReconcileKind, classify, reconcile, same_membership};
pub use view::OrderReconciler;

use thiserror::Error;
use todo_proto::task::{MutationFailure, TaskId};

/// Errors at the mutation boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title is empty after trimming. No request is sent.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length. No request is sent.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// The limit that was exceeded.
        max: usize,
    },
    /// The store rejected the request.
    #[error(transparent)]
    Rejected(#[from] MutationFailure),
}

/// Errors from a manual reorder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    /// The sequence names a task that is not in the view.
    #[error("unknown task in reorder: {0}")]
    UnknownTask(TaskId),
    /// The sequence leaves out a task that is in the view.
    #[error("reorder is missing task: {0}")]
    MissingTask(TaskId),
    /// The sequence names the same task twice.
    #[error("task listed twice in reorder: {0}")]
    DuplicateTask(TaskId),
    /// A row index does not exist in the visible list.
    #[error("row {index} out of range ({len} visible)")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of visible rows.
        len: usize,
    },
}
