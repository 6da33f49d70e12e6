//! Property-based tests for order reconciliation.
//!
//! For arbitrary previous orders and remote snapshots:
//! 1. The result holds exactly the snapshot's ids.
//! 2. Surviving ids keep their previous relative order.
//! 3. Field values come from the snapshot.
//! 4. New ids follow the survivors, in snapshot order.
//! 5. An unchanged membership leaves the order untouched.
//! 6. Reconciling the result against the same snapshot changes nothing.
//! 7. After any run of snapshots the order holds exactly the last one's ids.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use proptest::prelude::*;
use todo::tasks::{reconcile, same_membership};
use todo_proto::task::{Task, TaskId};
use uuid::Uuid;

fn make_task(n: u128, completed: bool, title: &str) -> Task {
    Task {
        id: TaskId::from_uuid(Uuid::from_u128(n)),
        title: format!("{title} {n}"),
        completed,
        description: None,
        created_at: 0,
    }
}

/// A list of tasks with unique ids drawn from a small universe, in random order.
fn arb_tasks(title: &'static str) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::hash_map(0u128..24, any::<bool>(), 0..16)
        .prop_map(|m| m.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
        .prop_map(move |pairs| {
            pairs
                .into_iter()
                .map(|(n, completed)| make_task(n, completed, title))
                .collect()
        })
}

fn ids(tasks: &[Task]) -> Vec<TaskId> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

proptest! {
    #[test]
    fn result_membership_matches_snapshot(
        previous in arb_tasks("local"),
        remote in arb_tasks("remote"),
    ) {
        let result = reconcile(&previous, &remote);
        prop_assert!(same_membership(&result, &remote));
    }

    #[test]
    fn survivors_keep_relative_order(
        previous in arb_tasks("local"),
        remote in arb_tasks("remote"),
    ) {
        let result = reconcile(&previous, &remote);
        if previous.is_empty() {
            return Ok(());
        }

        let remote_ids: HashSet<TaskId> = ids(&remote).into_iter().collect();
        let expected: Vec<TaskId> = ids(&previous)
            .into_iter()
            .filter(|id| remote_ids.contains(id))
            .collect();
        let survivors: Vec<TaskId> = ids(&result)
            .into_iter()
            .take(expected.len())
            .collect();
        prop_assert_eq!(survivors, expected);
    }

    #[test]
    fn fields_come_from_snapshot(
        previous in arb_tasks("local"),
        remote in arb_tasks("remote"),
    ) {
        let result = reconcile(&previous, &remote);
        for task in &result {
            let fresh = remote.iter().find(|t| t.id == task.id).unwrap();
            prop_assert_eq!(task, fresh);
        }
    }

    #[test]
    fn additions_follow_in_snapshot_order(
        previous in arb_tasks("local"),
        remote in arb_tasks("remote"),
    ) {
        let result = reconcile(&previous, &remote);
        let known: HashSet<TaskId> = ids(&previous).into_iter().collect();
        let added: Vec<TaskId> = ids(&remote)
            .into_iter()
            .filter(|id| !known.contains(id))
            .collect();

        let tail: Vec<TaskId> = ids(&result)
            .into_iter()
            .skip(result.len() - added.len())
            .collect();
        prop_assert_eq!(tail, added);
    }

    #[test]
    fn unchanged_membership_keeps_order(
        previous in arb_tasks("local"),
        flips in prop::collection::vec(any::<bool>(), 16),
    ) {
        // Same ids, reversed, with some completed flags flipped.
        let remote: Vec<Task> = previous
            .iter()
            .rev()
            .zip(flips.iter().cycle())
            .map(|(t, &flip)| Task { completed: t.completed ^ flip, ..t.clone() })
            .collect();

        let result = reconcile(&previous, &remote);
        prop_assert_eq!(ids(&result), ids(&previous));
    }

    #[test]
    fn reconcile_is_a_fixpoint(
        previous in arb_tasks("local"),
        remote in arb_tasks("remote"),
    ) {
        let once = reconcile(&previous, &remote);
        let twice = reconcile(&once, &remote);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn membership_converges_over_snapshot_runs(
        previous in arb_tasks("local"),
        run in prop::collection::vec(
            prop_oneof![1 => Just(Vec::new()), 4 => arb_tasks("remote")],
            1..8,
        ),
    ) {
        let order = run
            .iter()
            .fold(previous, |order, remote| reconcile(&order, remote));

        let last = run.last().unwrap();
        prop_assert!(same_membership(&order, last));
        prop_assert_eq!(order.len(), last.len());
    }
}
