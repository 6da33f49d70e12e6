//! Configuration for the todo client.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/todo/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that doesn't exist is.

use std::path::PathBuf;
use std::time::Duration;

use crate::net::NetConfig;
use crate::tasks::Filter;
use crate::tasks::filter::ParseFilterError;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The server URL is not a usable WebSocket URL.
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl {
        /// The rejected value.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The default filter name is not recognized.
    #[error(transparent)]
    InvalidFilter(#[from] ParseFilterError),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    network: NetworkFileConfig,
    ui: UiFileConfig,
}

/// `[network]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    server_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    max_title_len: Option<usize>,
    default_filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Default feed server URL.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:9400/ws";

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Network --
    /// Feed server WebSocket URL.
    pub server_url: String,
    /// Timeout for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Capacity of the command and event channels.
    pub channel_capacity: usize,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Maximum task title length in characters.
    pub max_title_len: usize,
    /// Filter active at startup.
    pub default_filter: Filter,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 256,
            poll_timeout: Duration::from_millis(50),
            max_title_len: todo_proto::task::MAX_TITLE_LENGTH,
            default_filter: Filter::All,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file cannot be read,
    /// the file cannot be parsed, or a resolved value is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server_url = cli
            .server_url
            .clone()
            .or_else(|| file.network.server_url.clone())
            .unwrap_or(defaults.server_url);
        validate_server_url(&server_url)?;

        let default_filter = match cli.filter.as_deref().or(file.ui.default_filter.as_deref()) {
            Some(name) => name.parse()?,
            None => defaults.default_filter,
        };

        Ok(Self {
            server_url,
            connect_timeout: file
                .network
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity: file
                .network
                .channel_capacity
                .unwrap_or(defaults.channel_capacity)
                .max(1),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            max_title_len: file.ui.max_title_len.unwrap_or(defaults.max_title_len),
            default_filter,
        })
    }

    /// Build the [`NetConfig`] for [`crate::net::spawn_net`].
    #[must_use]
    pub fn net_config(&self) -> NetConfig {
        NetConfig {
            server_url: self.server_url.clone(),
            connect_timeout: self.connect_timeout,
            channel_capacity: self.channel_capacity,
        }
    }
}

/// Checks that `raw` parses as a `ws://` or `wss://` URL.
fn validate_server_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(invalid(format!("expected ws or wss scheme, got {other}"))),
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal todo list with a live-synchronized order")]
pub struct CliArgs {
    /// WebSocket URL of the feed server.
    #[arg(long, env = "TODO_SERVER_URL")]
    pub server_url: Option<String>,

    /// Path to config file (default: `~/.config/todo/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Filter to start with (all, active, completed).
    #[arg(long)]
    pub filter: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TODO_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/todo.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Load and parse a TOML config file.
///
/// An explicit path must exist; the default path may be missing.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("todo").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
