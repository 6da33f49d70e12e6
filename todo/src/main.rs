//! `todo`: terminal todo list over a live task feed.
//!
//! Connects to a `todo-server` instance and keeps a locally ordered view of
//! its tasks. Configuration via CLI flags, environment variables, or config
//! file (`~/.config/todo/config.toml`).
//!
//! ```bash
//! # Default server (ws://127.0.0.1:9400/ws)
//! cargo run --bin todo
//!
//! # Another server, starting on the Active filter
//! cargo run --bin todo -- --server-url ws://10.0.0.5:9400/ws --filter active
//! ```

use std::io;
use std::path::Path;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use todo::app::App;
use todo::config::{CliArgs, ClientConfig};
use todo::net::{self, NetCommand, NetEvent};
use todo::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(server_url = %config.server_url, "todo starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("todo exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("todo.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main loop: draw, drain feed events, handle one key.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut app = App::with_settings(config.default_filter, config.max_title_len);

    let (cmd_tx, mut evt_rx) = match net::spawn_net(config.net_config()).await {
        Ok((tx, rx)) => (Some(tx), Some(rx)),
        Err(e) => {
            tracing::warn!(err = %e, "running offline");
            app.push_notice(format!("Offline: {e}"));
            (None, None)
        }
    };

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        if let Some(ref mut rx) = evt_rx {
            drain_net_events(&mut app, rx);
        }

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(net_cmd) = app.handle_key_event(key) {
                dispatch(&mut app, cmd_tx.as_ref(), net_cmd);
            }
        }

        if app.should_quit {
            if let Some(ref tx) = cmd_tx {
                let _ = tx.try_send(NetCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Forward a command to the network tasks, reporting why it could not be sent.
fn dispatch(app: &mut App, cmd_tx: Option<&mpsc::Sender<NetCommand>>, cmd: NetCommand) {
    let Some(tx) = cmd_tx.filter(|_| app.is_connected) else {
        app.push_notice("Not connected, change not sent");
        return;
    };
    match tx.try_send(cmd) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            app.push_notice("Network busy, change not sent");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            app.set_connection_status(false);
        }
    }
}

/// Apply every pending `NetEvent` to the app.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            NetEvent::Snapshot(tasks) => app.apply_snapshot(&tasks),
            NetEvent::MutationFailed {
                request_id,
                failure,
            } => {
                tracing::warn!(request_id, %failure, "mutation rejected");
                app.mutation_failed(&failure);
            }
            NetEvent::ConnectionStatus { connected } => app.set_connection_status(connected),
            NetEvent::Error(msg) => {
                tracing::warn!(error = %msg, "network error");
                app.push_notice(msg);
            }
        }
    }
}
