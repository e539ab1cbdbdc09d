//! Infrastructure layer for the client application.
//!
//! Contains the adapters behind the application ports and the process-level
//! plumbing of the binary.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `calc_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`transport`** – `UnixConnector`/`UnixTransport`, a blocking Unix
//!   socket that reads one frame at a time using the header's length field.
//!   A scripted transport for tests lives in `transport::mock`.
//!
//! - **`console`** – interactive menu on stdin/stdout implementing
//!   `InputSource`, plus rendering of session events for the terminal.
//!
//! - **`batch`** – file-driven input: a list of expressions with optional
//!   expected results, and the end-of-run report.
//!
//! - **`config`** – TOML configuration (`ClientConfig`).
//!
//! - **`cli`** – `clap` command-line arguments and their config overrides.

pub mod batch;
pub mod cli;
pub mod config;
pub mod console;
pub mod transport;
