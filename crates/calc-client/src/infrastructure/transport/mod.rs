//! Transport adapters.
//!
//! - [`unix`] – the production transport over a Unix domain socket.
//! - [`mock`] – a scripted in-memory transport for tests.

pub mod mock;
pub mod unix;

pub use unix::{UnixConnector, UnixTransport};
