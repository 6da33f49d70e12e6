//! Feed server: shared state, WebSocket handler and mutation dispatch.
//!
//! Each connection receives the current snapshot immediately, then a new
//! snapshot after every store change. Binary frames from the client are
//! decoded as [`ClientMessage`]s, applied to the [`TaskStore`], and answered
//! with a [`ServerMessage::MutationResult`] on the same connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use todo_proto::codec;
use todo_proto::feed::{ClientMessage, ServerMessage};
use todo_proto::task::MutationFailure;

use crate::store::TaskStore;

/// Default maximum allowed frame size in bytes (64 KB).
const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Shared server state holding the task store.
pub struct ServerState {
    /// The authoritative task collection.
    pub store: TaskStore,
    /// Maximum allowed inbound frame size in bytes.
    max_payload_size: usize,
    /// Source of connection ids for log correlation.
    next_conn_id: AtomicU64,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates server state with an empty store and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_PAYLOAD_SIZE, TaskStore::new())
    }

    /// Creates server state with a custom frame size limit and store.
    #[must_use]
    pub const fn with_config(max_payload_size: usize, store: TaskStore) -> Self {
        Self {
            store,
            max_payload_size,
            next_conn_id: AtomicU64::new(1),
        }
    }
}

/// Handles an upgraded WebSocket connection for a single client.
///
/// The connection lifecycle:
/// 1. Spawn a writer task draining an outbound channel into the socket.
/// 2. Spawn a feed task that pushes the current snapshot and every later one.
/// 3. Read client frames and answer mutations until the socket closes.
pub async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let conn_id = state.next_conn_id.fetch_add(1, Ordering::Relaxed);
    tracing::info!(conn_id, "client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(conn_id, "WebSocket write failed");
                break;
            }
        }
    });

    let mut feed = state.store.subscribe();
    let feed_tx = tx.clone();
    let mut feed_task = tokio::spawn(async move {
        loop {
            let tasks = feed.borrow_and_update().clone();
            tracing::debug!(conn_id, count = tasks.len(), "pushing snapshot");
            if !send_message(&feed_tx, &ServerMessage::Snapshot { tasks }) {
                break;
            }
            if feed.changed().await.is_err() {
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    handle_binary_message(conn_id, &data, &reader_state, &tx).await;
                }
                Message::Close(_) => {
                    tracing::info!(conn_id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore text, ping, pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {}
        _ = &mut write_task => {}
        _ = &mut feed_task => {}
    }
    read_task.abort();
    write_task.abort();
    feed_task.abort();

    tracing::info!(conn_id, "client disconnected");
}

/// Handles a binary WebSocket frame from a client.
async fn handle_binary_message(
    conn_id: u64,
    data: &[u8],
    state: &Arc<ServerState>,
    tx: &mpsc::UnboundedSender<Message>,
) {
    if data.len() > state.max_payload_size {
        tracing::warn!(
            conn_id,
            size = data.len(),
            max = state.max_payload_size,
            "frame exceeds size limit"
        );
        let err = ServerMessage::Error {
            reason: format!(
                "payload too large: {} bytes (max {})",
                data.len(),
                state.max_payload_size
            ),
        };
        send_message(tx, &err);
        return;
    }

    let msg = match codec::decode::<ClientMessage>(data) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(conn_id, error = %e, "failed to decode client frame");
            send_message(
                tx,
                &ServerMessage::Error {
                    reason: e.to_string(),
                },
            );
            return;
        }
    };

    match msg {
        ClientMessage::Mutate {
            request_id,
            mutation,
        } => {
            tracing::debug!(conn_id, request_id, ?mutation, "applying mutation");
            let result = state.store.apply(mutation).await;
            if let Err(e) = &result {
                tracing::info!(conn_id, request_id, error = %e, "mutation rejected");
            }
            let result = result.map_err(MutationFailure::from);
            send_message(tx, &ServerMessage::MutationResult { request_id, result });
        }
    }
}

/// Encodes and queues a message for the connection's writer task.
///
/// Returns `false` once the writer has gone away.
fn send_message(tx: &mpsc::UnboundedSender<Message>, msg: &ServerMessage) -> bool {
    match codec::encode(msg) {
        Ok(bytes) => tx.send(Message::Binary(bytes.into())).is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode server message");
            true
        }
    }
}

/// Starts the feed server on the given address with an empty store and
/// returns the bound address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the feed server with a pre-configured [`ServerState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "feed server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use todo_proto::task::{Mutation, MutationOutcome, NewTask, TaskId, TaskPatch};

    use super::*;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect(state: Arc<ServerState>) -> Client {
        let (addr, _handle) = start_server_with_state("127.0.0.1:0", state)
            .await
            .expect("failed to start test server");
        let (ws, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("connect");
        ws
    }

    async fn next_message(ws: &mut Client) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("ws error");
            if let WsMessage::Binary(data) = frame {
                return codec::decode(&data).expect("decode");
            }
        }
    }

    async fn send(ws: &mut Client, msg: &ClientMessage) {
        let bytes = codec::encode(msg).expect("encode");
        ws.send(WsMessage::Binary(bytes.into())).await.expect("send");
    }

    #[tokio::test]
    async fn connect_receives_current_snapshot() {
        let state = Arc::new(ServerState::new());
        state
            .store
            .create(NewTask::titled("Buy milk"))
            .await
            .unwrap();

        let mut ws = connect(state).await;
        match next_message(&mut ws).await {
            ServerMessage::Snapshot { tasks } => {
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].title, "Buy milk");
            }
            other => panic!("expected Snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_answers_and_pushes_snapshot() {
        let mut ws = connect(Arc::new(ServerState::new())).await;
        assert!(matches!(
            next_message(&mut ws).await,
            ServerMessage::Snapshot { ref tasks } if tasks.is_empty()
        ));

        send(
            &mut ws,
            &ClientMessage::Mutate {
                request_id: 1,
                mutation: Mutation::Create(NewTask::titled("Walk dog")),
            },
        )
        .await;

        let mut saw_result = false;
        let mut saw_snapshot = false;
        while !(saw_result && saw_snapshot) {
            match next_message(&mut ws).await {
                ServerMessage::MutationResult { request_id, result } => {
                    assert_eq!(request_id, 1);
                    assert!(matches!(result, Ok(MutationOutcome::Created(_))));
                    saw_result = true;
                }
                ServerMessage::Snapshot { tasks } => {
                    assert_eq!(tasks.len(), 1);
                    saw_snapshot = true;
                }
                ServerMessage::Error { reason } => panic!("unexpected error: {reason}"),
            }
        }
    }

    #[tokio::test]
    async fn rejected_mutation_reports_failure() {
        let mut ws = connect(Arc::new(ServerState::new())).await;
        next_message(&mut ws).await;

        let id = TaskId::new();
        send(
            &mut ws,
            &ClientMessage::Mutate {
                request_id: 9,
                mutation: Mutation::Update {
                    id: id.clone(),
                    patch: TaskPatch {
                        completed: Some(true),
                        ..Default::default()
                    },
                },
            },
        )
        .await;

        match next_message(&mut ws).await {
            ServerMessage::MutationResult { request_id, result } => {
                assert_eq!(request_id, 9);
                assert_eq!(result, Err(MutationFailure::NotFound(id)));
            }
            other => panic!("expected MutationResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_frame_rejected() {
        let state = Arc::new(ServerState::with_config(16, TaskStore::new()));
        let mut ws = connect(state).await;
        next_message(&mut ws).await;

        send(
            &mut ws,
            &ClientMessage::Mutate {
                request_id: 1,
                mutation: Mutation::Create(NewTask::titled("x".repeat(64))),
            },
        )
        .await;

        assert!(matches!(
            next_message(&mut ws).await,
            ServerMessage::Error { ref reason } if reason.contains("too large")
        ));
    }

    #[tokio::test]
    async fn garbage_frame_reports_error() {
        let mut ws = connect(Arc::new(ServerState::new())).await;
        next_message(&mut ws).await;

        ws.send(WsMessage::Binary(vec![0xFF, 0xFF].into()))
            .await
            .unwrap();
        assert!(matches!(
            next_message(&mut ws).await,
            ServerMessage::Error { .. }
        ));
    }
}
