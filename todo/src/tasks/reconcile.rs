//! Pure reconciliation of a local task order against a remote snapshot.
//!
//! The remote feed re-emits the whole task collection on every change, in an
//! order the store chooses. [`reconcile`] merges such a snapshot into the
//! order the user sees:
//!
//! 1. Empty snapshot: the view becomes empty.
//! 2. Empty view: the snapshot is taken verbatim.
//! 3. Membership changed: surviving tasks keep their relative order, new
//!    tasks are appended in snapshot order, removed tasks are dropped.
//! 4. Membership unchanged: the order is kept exactly, fields are refreshed.
//!
//! Field values always come from the snapshot. Membership is compared as a
//! set, so a snapshot that lists the same ids in a different order is a
//! plain refresh and never disturbs the local order.

use std::collections::{HashMap, HashSet};

use todo_proto::task::{Task, TaskId};

/// Which branch a reconciliation pass takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileKind {
    /// The snapshot was empty; the view is cleared.
    Reset,
    /// The view was empty; the snapshot seeds it.
    Seed,
    /// Ids were added and/or removed.
    Membership {
        /// Number of ids new in the snapshot.
        added: usize,
        /// Number of ids gone from the snapshot.
        removed: usize,
    },
    /// Same ids; only field values may differ.
    Refresh,
}

/// Returns the set of ids in a task list.
#[must_use]
pub fn membership(tasks: &[Task]) -> HashSet<&TaskId> {
    tasks.iter().map(|t| &t.id).collect()
}

/// Returns `true` if both lists hold the same ids, ignoring order.
#[must_use]
pub fn same_membership(a: &[Task], b: &[Task]) -> bool {
    a.len() == b.len() && membership(a) == membership(b)
}

/// Decides which branch [`reconcile`] takes for these inputs.
#[must_use]
pub fn classify(previous: &[Task], remote: &[Task]) -> ReconcileKind {
    if remote.is_empty() {
        return ReconcileKind::Reset;
    }
    if previous.is_empty() {
        return ReconcileKind::Seed;
    }

    let local_ids = membership(previous);
    let remote_ids = membership(remote);
    let added = remote_ids.difference(&local_ids).count();
    let removed = local_ids.difference(&remote_ids).count();

    if added == 0 && removed == 0 {
        ReconcileKind::Refresh
    } else {
        ReconcileKind::Membership { added, removed }
    }
}

/// Computes the new local order from the previous order and a remote snapshot.
///
/// Pure: the inputs are untouched and the result depends on nothing else.
#[must_use]
pub fn reconcile(previous: &[Task], remote: &[Task]) -> Vec<Task> {
    reconcile_with_kind(previous, remote).1
}

/// [`reconcile`] that also reports the branch, building each id set once.
#[must_use]
pub(crate) fn reconcile_with_kind(
    previous: &[Task],
    remote: &[Task],
) -> (ReconcileKind, Vec<Task>) {
    if remote.is_empty() {
        return (ReconcileKind::Reset, Vec::new());
    }
    if previous.is_empty() {
        return (ReconcileKind::Seed, remote.to_vec());
    }

    let known = membership(previous);
    let latest: HashMap<&TaskId, &Task> = remote.iter().map(|t| (&t.id, t)).collect();

    let mut order: Vec<Task> = previous
        .iter()
        .filter_map(|local| latest.get(&local.id).map(|&fresh| fresh.clone()))
        .collect();
    order.extend(remote.iter().filter(|t| !known.contains(&t.id)).cloned());

    let added = latest.keys().filter(|id| !known.contains(*id)).count();
    let removed = known.iter().filter(|id| !latest.contains_key(*id)).count();
    let kind = if added == 0 && removed == 0 {
        ReconcileKind::Refresh
    } else {
        ReconcileKind::Membership { added, removed }
    };
    (kind, order)
}
