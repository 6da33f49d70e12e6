//! Terminal todo client library.
//!
//! The feed server owns task data; this crate keeps the order the user sees
//! and reconciles it against every snapshot the server pushes.

pub mod app;
pub mod config;
pub mod net;
pub mod tasks;
pub mod ui;
