//! The locally ordered task view.
//!
//! [`OrderReconciler`] is the single owner of the displayed order. Every
//! snapshot from the feed goes through [`OrderReconciler::on_snapshot`];
//! manual reorders go through [`OrderReconciler::apply_reorder`] or the
//! visible-row helpers.

use std::collections::{HashMap, HashSet};

use todo_proto::task::{Task, TaskId};

use super::ReorderError;
use super::filter::Filter;
use super::reconcile::{ReconcileKind, reconcile_with_kind};

/// Holds the current order and the active filter.
#[derive(Debug, Default, Clone)]
pub struct OrderReconciler {
    order: Vec<Task>,
    filter: Filter,
}

impl OrderReconciler {
    /// Creates an empty view showing all tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty view with the given filter.
    #[must_use]
    pub const fn with_filter(filter: Filter) -> Self {
        Self {
            order: Vec::new(),
            filter,
        }
    }

    /// Reconciles the view against a remote snapshot.
    ///
    /// Returns which branch was taken.
    pub fn on_snapshot(&mut self, remote: &[Task]) -> ReconcileKind {
        let (kind, order) = reconcile_with_kind(&self.order, remote);
        self.order = order;
        tracing::debug!(?kind, len = self.order.len(), "reconciled snapshot");
        kind
    }

    /// The full ordered list, ignoring the filter.
    #[must_use]
    pub fn order(&self) -> &[Task] {
        &self.order
    }

    /// Ids in display order.
    #[must_use]
    pub fn ids(&self) -> Vec<TaskId> {
        self.order.iter().map(|t| t.id.clone()).collect()
    }

    /// Number of tasks, ignoring the filter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no tasks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.order.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub const fn filter(&self) -> Filter {
        self.filter
    }

    pub const fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Visible tasks under the active filter, in display order.
    pub fn visible(&self) -> impl Iterator<Item = &Task> {
        self.filter.apply(&self.order)
    }

    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.visible().count()
    }

    /// The visible task at a row index.
    #[must_use]
    pub fn visible_at(&self, index: usize) -> Option<&Task> {
        self.visible().nth(index)
    }

    /// Count of incomplete tasks, regardless of filter.
    #[must_use]
    pub fn items_left(&self) -> usize {
        self.order.iter().filter(|t| !t.completed).count()
    }

    /// Count of completed tasks, regardless of filter.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.order.len() - self.items_left()
    }

    /// Replaces the order with a full permutation of the current ids.
    ///
    /// # Errors
    ///
    /// Fails without touching the view if `ids` is not exactly a
    /// permutation of the current order.
    pub fn apply_reorder(&mut self, ids: &[TaskId]) -> Result<(), ReorderError> {
        let reordered = permute(&self.order, ids)?;
        self.order = reordered;
        Ok(())
    }

    /// Reorders only the visible rows.
    ///
    /// `ids` must be a permutation of the visible ids. They are written back
    /// into the slots the visible rows occupy, so hidden rows stay put.
    ///
    /// # Errors
    ///
    /// Fails without touching the view if `ids` is not exactly a
    /// permutation of the visible ids.
    pub fn reorder_visible(&mut self, ids: &[TaskId]) -> Result<(), ReorderError> {
        let slots: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, t)| self.filter.matches(t))
            .map(|(i, _)| i)
            .collect();
        let visible: Vec<Task> = slots.iter().map(|&i| self.order[i].clone()).collect();
        let reordered = permute(&visible, ids)?;

        for (slot, task) in slots.into_iter().zip(reordered) {
            self.order[slot] = task;
        }
        Ok(())
    }

    /// Moves the visible row at `from` so it ends up at visible row `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ReorderError::IndexOutOfRange`] if either index is past the
    /// visible rows.
    pub fn move_visible(&mut self, from: usize, to: usize) -> Result<(), ReorderError> {
        let mut ids: Vec<TaskId> = self.visible().map(|t| t.id.clone()).collect();
        let len = ids.len();
        for index in [from, to] {
            if index >= len {
                return Err(ReorderError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let moved = ids.remove(from);
        ids.insert(to, moved);
        self.reorder_visible(&ids)
    }
}

/// Rearranges `tasks` to follow `ids`, which must name each task exactly once.
fn permute(tasks: &[Task], ids: &[TaskId]) -> Result<Vec<Task>, ReorderError> {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let mut seen: HashSet<&TaskId> = HashSet::with_capacity(ids.len());
    let mut out = Vec::with_capacity(ids.len());

    for id in ids {
        let Some(&task) = by_id.get(id) else {
            return Err(ReorderError::UnknownTask(id.clone()));
        };
        if !seen.insert(id) {
            return Err(ReorderError::DuplicateTask(id.clone()));
        }
        out.push(task.clone());
    }

    if let Some(missing) = tasks.iter().find(|t| !seen.contains(&t.id)) {
        return Err(ReorderError::MissingTask(missing.id.clone()));
    }
    Ok(out)
}
