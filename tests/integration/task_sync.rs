//! Integration tests for keeping a local task order in sync with the feed.
//!
//! Covers the reconciler driven straight from a store's watch channel, and
//! the full path through the WebSocket server and the client net bridge.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use todo::app::App;
use todo::net::{self, NetCommand, NetConfig, NetEvent};
use todo::tasks::{Filter, OrderReconciler, ReconcileKind, mutation};
use todo_proto::task::{Mutation, MutationFailure, NewTask, Task, TaskId, TaskPatch};
use todo_server::server::{ServerState, start_server, start_server_with_state};
use todo_server::store::TaskStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn titles(view: &OrderReconciler) -> Vec<String> {
    view.order().iter().map(|t| t.title.clone()).collect()
}

async fn connect(url: &str) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let mut config = NetConfig::new(url.to_string());
    config.connect_timeout = Duration::from_secs(5);
    net::spawn_net(config).await.expect("connect to test server")
}

/// Waits for the next snapshot, skipping other events.
async fn next_snapshot(rx: &mut mpsc::Receiver<NetEvent>) -> Vec<Task> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(NetEvent::Snapshot(tasks)) => return tasks,
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("snapshot within timeout")
}

/// Waits until a snapshot with `len` tasks arrives.
async fn snapshot_of_len(rx: &mut mpsc::Receiver<NetEvent>, len: usize) -> Vec<Task> {
    loop {
        let tasks = next_snapshot(rx).await;
        if tasks.len() == len {
            return tasks;
        }
    }
}

async fn mutate(tx: &mpsc::Sender<NetCommand>, m: Mutation) {
    tx.send(NetCommand::Mutate(m)).await.expect("command sent");
}

// ---------------------------------------------------------------------------
// Store feed -> reconciler, no network
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_feed_drives_reconciler() {
    let store = TaskStore::new();
    let mut feed = store.subscribe();
    let mut view = OrderReconciler::new();

    let milk = store.create(NewTask::titled("Buy milk")).await.unwrap();
    let dog = store.create(NewTask::titled("Walk dog")).await.unwrap();
    let bills = store.create(NewTask::titled("Pay bills")).await.unwrap();

    let kind = view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(kind, ReconcileKind::Seed);
    assert_eq!(titles(&view), vec!["Buy milk", "Walk dog", "Pay bills"]);

    view.apply_reorder(&[bills, milk.clone(), dog.clone()]).unwrap();

    store
        .update(
            &dog,
            TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let kind = view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(kind, ReconcileKind::Refresh);
    assert_eq!(titles(&view), vec!["Pay bills", "Buy milk", "Walk dog"]);
    assert_eq!(view.items_left(), 2);

    store.create(NewTask::titled("Call mom")).await.unwrap();
    view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(
        titles(&view),
        vec!["Pay bills", "Buy milk", "Walk dog", "Call mom"]
    );

    assert_eq!(store.clear_completed().await, 1);
    let kind = view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(
        kind,
        ReconcileKind::Membership {
            added: 0,
            removed: 1
        }
    );
    assert_eq!(titles(&view), vec!["Pay bills", "Buy milk", "Call mom"]);

    for task in store.snapshot().await {
        assert!(store.delete(&task.id).await);
    }
    assert!(!store.delete(&milk).await);
    let kind = view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(kind, ReconcileKind::Reset);
    assert!(view.is_empty());
}

#[tokio::test]
async fn store_feed_reorder_toggle_filter_delete() {
    let store = TaskStore::new();
    let mut feed = store.subscribe();
    let mut view = OrderReconciler::new();

    let milk = store.create(NewTask::titled("Buy milk")).await.unwrap();
    let dog = store.create(NewTask::titled("Walk dog")).await.unwrap();
    let bills = store.create(NewTask::titled("Pay bills")).await.unwrap();
    view.on_snapshot(&feed.borrow_and_update());

    view.apply_reorder(&[bills, milk.clone(), dog.clone()]).unwrap();

    let toggled = view.get(&milk).cloned().unwrap();
    let Mutation::Update { id, patch } = mutation::toggle_task(&toggled) else {
        panic!("toggle should build an update");
    };
    store.update(&id, patch).await.unwrap();
    view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(titles(&view), vec!["Pay bills", "Buy milk", "Walk dog"]);

    let before = view.ids();
    view.set_filter(Filter::Active);
    let visible: Vec<&str> = view.visible().map(|t| t.title.as_str()).collect();
    assert_eq!(visible, vec!["Pay bills", "Walk dog"]);
    assert_eq!(view.ids(), before);

    assert!(store.delete(&dog).await);
    view.on_snapshot(&feed.borrow_and_update());
    assert_eq!(titles(&view), vec!["Pay bills", "Buy milk"]);
}

#[tokio::test]
async fn filtered_reorder_keeps_hidden_tasks() {
    let store = TaskStore::new();
    let feed = store.subscribe();
    let a = store.create(NewTask::titled("A")).await.unwrap();
    let b = store.create(NewTask::titled("B")).await.unwrap();
    let c = store.create(NewTask::titled("C")).await.unwrap();
    store
        .update(
            &b,
            TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut view = OrderReconciler::with_filter(Filter::Active);
    view.on_snapshot(&feed.borrow());
    view.reorder_visible(&[c, a]).unwrap();

    assert_eq!(titles(&view), vec!["C", "B", "A"]);
    view.set_filter(Filter::All);
    assert_eq!(view.visible_len(), 3);
}

// ---------------------------------------------------------------------------
// Full path over WebSocket
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_sees_initial_snapshot_and_own_create() {
    let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
    let (tx, mut rx) = connect(&format!("ws://{addr}/ws")).await;

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap();
    assert!(matches!(
        first,
        Some(NetEvent::ConnectionStatus { connected: true })
    ));
    assert!(next_snapshot(&mut rx).await.is_empty());

    mutate(&tx, mutation::create_task("  Buy milk ", 256).unwrap()).await;
    let tasks = snapshot_of_len(&mut rx, 1).await;
    assert_eq!(tasks[0].title, "Buy milk");
    assert!(!tasks[0].completed);
}

#[tokio::test]
async fn second_client_sees_first_clients_changes() {
    let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{addr}/ws");
    let (alice_tx, mut alice_rx) = connect(&url).await;
    let (_bob_tx, mut bob_rx) = connect(&url).await;

    next_snapshot(&mut alice_rx).await;
    next_snapshot(&mut bob_rx).await;

    mutate(&alice_tx, Mutation::Create(NewTask::titled("Walk dog"))).await;
    let seen = snapshot_of_len(&mut bob_rx, 1).await;
    assert_eq!(seen[0].title, "Walk dog");

    mutate(&alice_tx, mutation::toggle_task(&seen[0])).await;
    let toggled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let tasks = next_snapshot(&mut bob_rx).await;
            if tasks.first().is_some_and(|t| t.completed) {
                return tasks;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(toggled[0].id, seen[0].id);
}

#[tokio::test]
async fn local_order_survives_remote_toggle() {
    let state = Arc::new(ServerState::new());
    let a = state.store.create(NewTask::titled("A")).await.unwrap();
    state.store.create(NewTask::titled("B")).await.unwrap();
    state.store.create(NewTask::titled("C")).await.unwrap();
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();

    let (_tx, mut rx) = connect(&format!("ws://{addr}/ws")).await;
    let mut app = App::new();
    app.apply_snapshot(&next_snapshot(&mut rx).await);
    app.tasks.move_visible(0, 2).unwrap();
    assert_eq!(titles(&app.tasks), vec!["B", "C", "A"]);

    // Another writer toggles "A" directly on the store.
    state
        .store
        .update(
            &a,
            TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let tasks = next_snapshot(&mut rx).await;
    app.apply_snapshot(&tasks);
    assert_eq!(titles(&app.tasks), vec!["B", "C", "A"]);
    assert!(app.tasks.get(&a).unwrap().completed);
    assert_eq!(app.items_left_label(), "2 items left");
}

#[tokio::test]
async fn rejected_mutation_reaches_client() {
    let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
    let (tx, mut rx) = connect(&format!("ws://{addr}/ws")).await;
    next_snapshot(&mut rx).await;

    let ghost = TaskId::new();
    mutate(&tx, mutation::delete_task(&ghost)).await;
    mutate(
        &tx,
        Mutation::Update {
            id: ghost.clone(),
            patch: TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        },
    )
    .await;

    let failure = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(NetEvent::MutationFailed {
                request_id,
                failure,
            }) = rx.recv().await
            {
                return (request_id, failure);
            }
        }
    })
    .await
    .unwrap();

    // Delete of a missing id succeeds silently; the update is request 2.
    assert_eq!(failure, (2, MutationFailure::NotFound(ghost)));
}

#[tokio::test]
async fn shutdown_closes_connection() {
    let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
    let (tx, mut rx) = connect(&format!("ws://{addr}/ws")).await;
    next_snapshot(&mut rx).await;

    tx.send(NetCommand::Shutdown).await.unwrap();

    let disconnected = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(NetEvent::ConnectionStatus { connected: false }) | None => return true,
                Some(_) => {}
            }
        }
    })
    .await
    .unwrap();
    assert!(disconnected);
}
