//! Todo feed server.
//!
//! An axum WebSocket server that owns the authoritative task collection,
//! pushes full snapshots to every connected client, and applies mutations.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9400
//! cargo run --bin todo-server
//!
//! # Run on custom address
//! cargo run --bin todo-server -- --bind 127.0.0.1:8080
//! ```

use std::sync::Arc;

use clap::Parser;
use todo_server::config::{ServerCliArgs, ServerConfig};
use todo_server::server::{self, ServerState};
use todo_server::store::TaskStore;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting todo feed server");

    let store = TaskStore::with_max_title_len(config.max_title_len);
    let state = Arc::new(ServerState::with_config(config.max_payload_size, store));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "feed server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "feed server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start feed server");
            std::process::exit(1);
        }
    }
}
