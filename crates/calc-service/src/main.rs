//! calc-link service entry point.
//!
//! Loads the configuration, binds the Unix socket, and serves clients until
//! Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::load_config()      -- TOML settings plus flag overrides
//!  └─ CalcServer::bind()      -- replaces a stale socket file
//!  └─ CalcServer::run()       -- accept loop, one task per connection
//!       └─ serve_connection()    -- admission, announcement, request loop
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use calc_service::infrastructure::cli::Cli;
use calc_service::infrastructure::server::CalcServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("loading service configuration")?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("calc-link service starting");

    let server = CalcServer::bind(&config)?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!(
        socket = %server.socket_path().display(),
        "calc-link service ready.  Press Ctrl-C to exit."
    );
    server.run(running).await?;

    info!("calc-link service stopped");
    Ok(())
}
