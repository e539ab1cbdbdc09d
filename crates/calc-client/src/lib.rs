//! calc-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does calc-client do? (for beginners)
//!
//! The client talks to a calc-link *service* over a local Unix socket.  One
//! run of the client is one *session*:
//!
//! 1. Connect to the service and wait for its `ServiceAnnouncement`.
//! 2. Ask the user (or a cases file) for an expression such as `3+4`.
//! 3. Send it as a `Data` message, wait for the `Ack`, then wait for the
//!    result (`Data`) or a peer-reported error.
//! 4. Repeat from step 2 until the user chooses Exit, then close the socket.
//!
//! The session is an explicit state machine
//! ([`application::session::ClientSession`]) that is independent of any real
//! I/O: it only sees the [`application::ports`] traits, so tests can drive it
//! with a scripted transport and mocked input.

/// Application layer: the session state machine and its ports.
pub mod application;

/// Infrastructure layer: Unix socket transport, console and batch input, config.
pub mod infrastructure;
