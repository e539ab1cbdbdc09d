//! TOML configuration for the service.
//!
//! Read from `$CALC_SERVICE_CONFIG` when set, otherwise from
//! `$XDG_CONFIG_HOME/calc-link/service.toml` (or
//! `~/.config/calc-link/service.toml`).
//!
//! # Serde default values
//!
//! Every field is annotated with `#[serde(default = "some_fn")]`, so the
//! service runs with no config file at all, and a file only lists what it
//! changes:
//!
//! ```toml
//! socket_path = "/run/calc/math.socket"
//! client_timeout_secs = 60
//! log_level = "debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "CALC_SERVICE_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the override variable nor a config base directory is set.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Unix socket to listen on.  A stale file at this path is replaced.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Answer requests with a mismatching checksum with an `Error`.
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
    /// Largest frame accepted from a client, in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Seconds a connected client may stay silent before it is dropped.
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ServiceConfig {
    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/math_chardev.socket")
}
fn default_true() -> bool {
    true
}
fn default_max_frame_len() -> usize {
    64 * 1024
}
fn default_client_timeout_secs() -> u64 {
    1800
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            verify_checksum: default_true(),
            max_frame_len: default_max_frame_len(),
            client_timeout_secs: default_client_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when none of `CALC_SERVICE_CONFIG`,
/// `XDG_CONFIG_HOME` or `HOME` is set.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("calc-link").join("service.toml"))
}

/// Loads `ServiceConfig` from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServiceConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
