//! Command-line arguments for the service binary.
//!
//! Flags given on the command line take precedence over the config file.

use std::path::PathBuf;

use clap::Parser;

use super::config::{config_file_path, load_config_from, ConfigError, ServiceConfig};

/// calc-link arithmetic service.
///
/// Listens on a Unix socket and evaluates one client's requests at a time
/// until Ctrl-C.
#[derive(Debug, Parser)]
#[command(
    name = "calc-service",
    about = "Evaluate calc-link arithmetic requests on a Unix socket",
    version
)]
pub struct Cli {
    /// Config file to read instead of the default location.
    #[arg(long, env = "CALC_SERVICE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Unix socket to listen on.  Overrides `socket_path` from the config.
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Seconds a silent client may stay connected.  Overrides
    /// `client_timeout_secs` from the config.
    #[arg(long)]
    pub client_timeout_secs: Option<u64>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// As [`load_config_from`], plus [`ConfigError::NoConfigDir`] when no
    /// `--config` is given and no default location can be resolved.
    pub fn load_config(&self) -> Result<ServiceConfig, ConfigError> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config_file_path()?,
        };
        let mut config = load_config_from(&path)?;
        if let Some(socket) = &self.socket {
            config.socket_path = socket.clone();
        }
        if let Some(secs) = self.client_timeout_secs {
            config.client_timeout_secs = secs;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_prints_usage() {
        let result = Cli::try_parse_from(["calc-service", "--help"]);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_stray_positional_is_rejected() {
        let result = Cli::try_parse_from(["calc-service", "extra"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("calc_service_cli_{}.toml", Uuid::new_v4()));
        std::fs::write(&path, "socket_path = \"/run/from-file.sock\"\nmax_frame_len = 128\n")
            .unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            socket: Some(PathBuf::from("/run/from-flag.sock")),
            client_timeout_secs: Some(5),
        };

        // Act
        let config = cli.load_config().unwrap();

        // Assert
        assert_eq!(config.socket_path, PathBuf::from("/run/from-flag.sock"));
        assert_eq!(config.max_frame_len, 128);
        assert_eq!(config.client_timeout(), Duration::from_secs(5));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_timeout_flag_parses() {
        let cli = Cli::try_parse_from(["calc-service", "--client-timeout-secs", "60"]).unwrap();

        assert_eq!(cli.client_timeout_secs, Some(60));
        assert_eq!(cli.socket, None);
    }
}
