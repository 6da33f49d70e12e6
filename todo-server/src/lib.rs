//! Todo feed server library.
//!
//! Exposes the task store and WebSocket server for use in tests and
//! embedding. The server owns the authoritative task collection and
//! pushes a full snapshot to every client after each change.

pub mod config;
pub mod server;
pub mod store;
