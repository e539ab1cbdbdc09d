//! Command-line arguments for the client binary.
//!
//! The `#[derive(Parser)]` macro from `clap` builds the parser from the
//! struct fields.  Flags given on the command line take precedence over the
//! config file.

use std::path::PathBuf;

use clap::Parser;

use super::config::{config_file_path, load_config_from, ClientConfig, ConfigError};

/// calc-link client.
///
/// Without arguments, shows an interactive menu.  With a cases file, sends
/// every case and prints a PASS/FAIL report.
#[derive(Debug, Parser)]
#[command(
    name = "calc-client",
    about = "Send arithmetic requests to a calc-link service",
    version
)]
pub struct Cli {
    /// File of `expression[,expected]` lines to run instead of the menu.
    pub cases: Option<PathBuf>,

    /// Config file to read instead of the default location.
    #[arg(long, env = "CALC_CLIENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Unix socket of the service.  Overrides `socket_path` from the config.
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Accept replies whose checksum does not match their payload.
    #[arg(long)]
    pub no_verify_checksum: bool,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// As [`load_config_from`], plus [`ConfigError::NoConfigDir`] when no
    /// `--config` is given and no default location can be resolved.
    pub fn load_config(&self) -> Result<ClientConfig, ConfigError> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config_file_path()?,
        };
        let mut config = load_config_from(&path)?;
        if let Some(socket) = &self.socket {
            config.socket_path = socket.clone();
        }
        if self.no_verify_checksum {
            config.verify_checksum = false;
        }
        Ok(config)
    }
}
