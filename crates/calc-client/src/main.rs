//! calc-link client entry point.
//!
//! ```text
//! calc-client [--socket PATH] [--config FILE]               interactive menu
//! calc-client [--socket PATH] [--config FILE] <cases-file>  run every case
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()                  -- clap arguments
//!  └─ Cli::load_config()            -- TOML settings plus flag overrides
//!  └─ UnixConnector::new()          -- socket path, retries, frame limit
//!  └─ ClientSession::run()          -- the protocol state machine
//!       ├─ ConsoleInput / BatchInput   -- where requests come from
//!       └─ on_event                    -- print results, feed the report
//! ```
//!
//! Menu prompts and results go to stdout; logs go to stderr.  The process
//! exits non-zero when the session fails or a batch case does not pass.

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use calc_client::application::session::ClientSession;
use calc_client::infrastructure::{
    batch::{load_cases, BatchInput, BatchReport},
    cli::Cli,
    config::ClientConfig,
    console::{render_event, ConsoleInput},
    transport::UnixConnector,
};
use calc_core::ChecksumPolicy;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("loading client configuration")?;

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(socket = %config.socket_path.display(), "calc-link client starting");

    match &cli.cases {
        Some(cases_file) => run_batch(&config, cases_file),
        None => run_interactive(&config),
    }
}

fn connector(config: &ClientConfig) -> UnixConnector {
    UnixConnector::new(&config.socket_path)
        .with_retries(
            config.connect_retries,
            Duration::from_millis(config.retry_delay_ms),
        )
        .with_max_frame_len(config.max_frame_len)
}

fn run_interactive(config: &ClientConfig) -> anyhow::Result<()> {
    let input = ConsoleInput::new(io::stdin().lock(), io::stdout());
    let mut session = ClientSession::new(connector(config), input)
        .with_checksum_policy(ChecksumPolicy::from_flag(config.verify_checksum));

    let mut stdout = io::stdout();
    session.run(|event| {
        if let Err(e) = render_event(&mut stdout, event) {
            tracing::warn!("failed to write to stdout: {e}");
        }
    });

    if let Some(err) = session.failure() {
        bail!("session {} failed: {err}", session.id());
    }
    Ok(())
}

fn run_batch(config: &ClientConfig, path: &Path) -> anyhow::Result<()> {
    let cases = load_cases(path)?;
    info!(cases = cases.len(), file = %path.display(), "running batch");

    let mut report = BatchReport::new(cases.clone());
    let mut session = ClientSession::new(connector(config), BatchInput::new(&cases))
        .with_checksum_policy(ChecksumPolicy::from_flag(config.verify_checksum));
    session.run(|event| report.record(event));

    report
        .render(&mut io::stdout())
        .context("writing batch report")?;

    if let Some(err) = session.failure() {
        bail!("session {} failed: {err}", session.id());
    }
    let failures = report.failures();
    if failures > 0 {
        bail!("{failures} case(s) failed");
    }
    Ok(())
}
