//! Messages exchanged between a todo client and the feed server.
//!
//! The server pushes a full [`ServerMessage::Snapshot`] on connect and after
//! every change to the store. Clients never receive deltas; they diff whole
//! snapshots themselves. Mutations travel the other way as
//! [`ClientMessage::Mutate`] and are answered on the same connection.

use serde::{Deserialize, Serialize};

use crate::task::{Mutation, MutationFailure, MutationOutcome, Task};

/// Messages sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Apply a mutation to the store.
    Mutate {
        /// Client-chosen id echoed back in the [`ServerMessage::MutationResult`].
        request_id: u64,
        /// The change to apply.
        mutation: Mutation,
    },
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The full current task collection, in store order.
    Snapshot {
        /// Every task currently stored.
        tasks: Vec<Task>,
    },
    /// Answer to a [`ClientMessage::Mutate`].
    MutationResult {
        /// The id the client sent.
        request_id: u64,
        /// What happened.
        result: Result<MutationOutcome, MutationFailure>,
    },
    /// The server could not process a frame.
    Error {
        /// Human-readable error description.
        reason: String,
    },
}
