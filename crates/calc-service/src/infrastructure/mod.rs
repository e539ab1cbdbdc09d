//! Infrastructure layer for the service.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `calc_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`server`** – the tokio Unix socket listener, single-client admission,
//!   per-connection frame loop with read timeout, and shutdown.
//!
//! - **`config`** – TOML configuration (`ServiceConfig`).
//!
//! - **`cli`** – `clap` command-line arguments and their config overrides.

pub mod cli;
pub mod config;
pub mod server;
