//! TOML configuration for the client.
//!
//! The file is looked up at:
//! - `$CALC_CLIENT_CONFIG`, when set;
//! - otherwise `$XDG_CONFIG_HOME/calc-link/client.toml`, falling back to
//!   `~/.config/calc-link/client.toml`.
//!
//! A missing file yields [`ClientConfig::default()`].  Every field has a
//! serde default, so a file only needs the settings it changes:
//!
//! ```toml
//! socket_path = "/run/calc/math.socket"
//! connect_retries = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "CALC_CLIENT_CONFIG";

/// Socket path the service listens on by default.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/math_chardev.socket";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the override variable nor a config base directory is set.
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Unix socket the service listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Reject frames whose checksum does not match their payload.
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
    /// Largest frame accepted from the service, in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Connection attempts before giving up.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// Pause between connection attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}
fn default_true() -> bool {
    true
}
fn default_max_frame_len() -> usize {
    64 * 1024
}
fn default_connect_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            verify_checksum: default_true(),
            max_frame_len: default_max_frame_len(),
            connect_retries: default_connect_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the config file path from the environment.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when none of `CALC_CLIENT_CONFIG`,
/// `XDG_CONFIG_HOME` or `HOME` is set.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("calc-link").join("client.toml"))
}

/// Loads the config from `path`, returning the defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
