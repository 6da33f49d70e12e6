//! Networking bridge between the TUI loop and the feed server.
//!
//! The TUI runs a synchronous poll loop; the WebSocket connection lives on
//! tokio background tasks. The two sides talk over bounded channels:
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  reader loop
//!                     ─── NetCommand →  command handler
//! ```
//!
//! The reader loop forwards every snapshot the server pushes and every
//! rejected mutation. Successful mutation results are only logged: their
//! effect arrives as the next snapshot.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use todo_proto::codec::{self, CodecError};
use todo_proto::feed::{ClientMessage, ServerMessage};
use todo_proto::task::{Mutation, MutationFailure, Task};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSender = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Commands sent from the TUI loop to the background tasks.
#[derive(Debug)]
pub enum NetCommand {
    /// Send a mutation to the store.
    Mutate(Mutation),
    /// Close the connection and stop the background tasks.
    Shutdown,
}

/// Events sent from the background tasks to the TUI loop.
#[derive(Debug)]
pub enum NetEvent {
    /// The server pushed the current task collection.
    Snapshot(Vec<Task>),
    /// The store rejected a mutation.
    MutationFailed {
        /// Id the request was sent with.
        request_id: u64,
        /// Why it was rejected.
        failure: MutationFailure,
    },
    /// Connection state changed.
    ConnectionStatus {
        /// Whether the feed is live.
        connected: bool,
    },
    /// Something went wrong that the user should see.
    Error(String),
}

/// Errors from [`spawn_net`].
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The server did not accept the connection in time.
    #[error("connection to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },
    /// The WebSocket handshake failed.
    #[error("connection to {url} failed: {source}")]
    Connect {
        /// Target URL.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
}

/// Default channel capacity for commands and events.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default time allowed for the WebSocket handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the networking layer.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// WebSocket URL of the feed server (e.g. `ws://127.0.0.1:9400/ws`).
    pub server_url: String,
    /// Handshake timeout.
    pub connect_timeout: Duration,
    /// Capacity of the command and event channels.
    pub channel_capacity: usize,
}

impl NetConfig {
    /// Creates a `NetConfig` with default timeout and capacity.
    #[must_use]
    pub const fn new(server_url: String) -> Self {
        Self {
            server_url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Connect to the feed server and spawn the background tasks.
///
/// On success the first event on the returned receiver is
/// `ConnectionStatus { connected: true }`, followed by the initial snapshot.
///
/// # Errors
///
/// Returns [`NetError`] if the handshake times out or fails. The caller
/// should keep running offline.
pub async fn spawn_net(
    config: NetConfig,
) -> Result<(mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>), NetError> {
    let url = config.server_url.clone();
    let (ws_stream, _response) =
        tokio::time::timeout(config.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                tracing::warn!(url = %url, "feed connect timed out");
                NetError::Timeout { url: url.clone() }
            })?
            .map_err(|e| {
                tracing::warn!(url = %url, err = %e, "feed connect failed");
                NetError::Connect {
                    url: url.clone(),
                    source: Box::new(e),
                }
            })?;
    tracing::info!(url = %url, "connected to feed server");

    let (ws_sender, ws_reader) = ws_stream.split();

    let capacity = config.channel_capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel::<NetCommand>(capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(capacity);

    let _ = evt_tx
        .send(NetEvent::ConnectionStatus { connected: true })
        .await;

    let reader_evt_tx = evt_tx.clone();
    tokio::spawn(async move {
        reader_loop(ws_reader, reader_evt_tx).await;
    });

    tokio::spawn(async move {
        command_handler(ws_sender, cmd_rx, evt_tx).await;
    });

    Ok((cmd_tx, evt_rx))
}

/// Background task: turn server frames into [`NetEvent`]s.
async fn reader_loop(mut ws_reader: WsReader, evt_tx: mpsc::Sender<NetEvent>) {
    while let Some(frame) = ws_reader.next().await {
        let event = match frame {
            Ok(Message::Binary(data)) => match codec::decode::<ServerMessage>(&data) {
                Ok(msg) => server_event(msg),
                Err(e) => {
                    tracing::warn!(err = %e, "malformed server frame, skipping");
                    None
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("feed closed by server");
                break;
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(err = %e, "feed read error");
                break;
            }
        };

        if let Some(event) = event
            && evt_tx.send(event).await.is_err()
        {
            // TUI dropped.
            return;
        }
    }

    let _ = evt_tx
        .send(NetEvent::ConnectionStatus { connected: false })
        .await;
    tracing::info!("feed reader exiting");
}

/// Maps a decoded server message to the event the TUI cares about.
fn server_event(msg: ServerMessage) -> Option<NetEvent> {
    match msg {
        ServerMessage::Snapshot { tasks } => {
            tracing::trace!(count = tasks.len(), "snapshot received");
            Some(NetEvent::Snapshot(tasks))
        }
        ServerMessage::MutationResult { request_id, result } => match result {
            Ok(outcome) => {
                tracing::debug!(request_id, ?outcome, "mutation applied");
                None
            }
            Err(failure) => Some(NetEvent::MutationFailed {
                request_id,
                failure,
            }),
        },
        ServerMessage::Error { reason } => {
            tracing::warn!(reason = %reason, "server error");
            Some(NetEvent::Error(format!("Server error: {reason}")))
        }
    }
}

/// Background task: send mutations until shutdown or the TUI goes away.
async fn command_handler(
    mut ws_sender: WsSender,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    let mut next_request_id: u64 = 1;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            NetCommand::Mutate(mutation) => {
                let request_id = next_request_id;
                next_request_id += 1;

                if let Err(e) = send_mutation(&mut ws_sender, request_id, mutation).await {
                    tracing::warn!(request_id, err = %e, "failed to send mutation");
                    let _ = evt_tx
                        .send(NetEvent::Error(format!("Send failed: {e}")))
                        .await;
                }
            }
            NetCommand::Shutdown => {
                tracing::info!("net command handler shutting down");
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
}

async fn send_mutation(
    ws_sender: &mut WsSender,
    request_id: u64,
    mutation: Mutation,
) -> Result<(), SendError> {
    let bytes = codec::encode(&ClientMessage::Mutate {
        request_id,
        mutation,
    })?;
    tracing::debug!(request_id, len = bytes.len(), "sending mutation");
    ws_sender.send(Message::Binary(bytes.into())).await?;
    Ok(())
}
