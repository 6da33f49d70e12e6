//! Shared task model and wire format for the todo client and server.

pub mod codec;
pub mod feed;
pub mod task;
