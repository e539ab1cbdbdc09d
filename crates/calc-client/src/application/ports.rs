//! Ports: the traits a [`ClientSession`](super::session::ClientSession)
//! depends on.
//!
//! The session never touches a socket or a terminal directly.  It asks a
//! [`Connector`] for a [`Transport`], exchanges whole frames through it, and
//! asks an [`InputSource`] what to send next.  Infrastructure adapters
//! implement these traits; tests substitute scripted or mocked ones.

use calc_core::{Expression, FramingError};
use thiserror::Error;

/// Errors raised by a transport or connector.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting to the service failed on every attempt.
    #[error("failed to connect to {endpoint} after {attempts} attempt(s): {source}")]
    ConnectFailed {
        endpoint: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes received do not form a valid frame.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// The peer closed the stream.
    #[error("connection closed by service")]
    Closed,
}

/// A connected, ordered, reliable duplex byte stream.
///
/// `receive` returns the bytes of exactly one frame.  An empty vector means
/// the peer closed the stream.
pub trait Transport {
    /// Writes all of `bytes` to the stream.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Blocks until one whole frame has been read.
    fn receive(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Shuts the stream down.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Produces a [`Transport`] connected to a service.
pub trait Connector {
    type Transport: Transport;

    /// Human-readable description of where [`connect`](Self::connect) goes.
    fn endpoint(&self) -> String;

    /// Establishes a connection.
    fn connect(&mut self) -> Result<Self::Transport, TransportError>;
}

/// What the user wants to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInput {
    /// Send this expression to the service.
    Request(Expression),
    /// Send this text as the request payload, exactly as given.
    Raw(String),
    /// End the session.
    Exit,
}

/// Supplies the next request of a session.
///
/// Interactive sources only hand out well-formed requests; anything the user
/// typed that cannot be sent is dealt with before returning.  Scripted
/// sources may hand out [`ClientInput::Raw`] text to test the service's
/// handling of malformed requests.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource {
    fn next_input(&mut self) -> ClientInput;
}
