//! Scripted in-memory transport for unit testing.
//!
//! # Why a scripted transport?
//!
//! A session test needs to play the service's side of the conversation:
//! "send the announcement, then an Ack, then `7`".  [`ScriptedTransport`]
//! replays a queue of canned replies from `receive()` and records everything
//! passed to `send()` so assertions can inspect exactly what the session put
//! on the wire and in what order.
//!
//! The session takes ownership of the transport, so the records live in a
//! shared [`TransportLog`] that the test keeps a handle to.
//!
//! # Usage in tests
//!
//! ```ignore
//! let log = Arc::new(TransportLog::default());
//! let connector = ScriptedConnector::new(
//!     vec![Message::service_announcement(), Message::ack(), Message::data("7")],
//!     Arc::clone(&log),
//! );
//! // ... run a session over `connector` ...
//! assert_eq!(log.sent().len(), 1);
//! assert_eq!(log.close_count(), 1);
//! ```
//!
//! When the script runs out, `receive()` returns an empty buffer, which the
//! session treats as the peer closing the stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use calc_core::{encode_message, Message};

use crate::application::ports::{Connector, Transport, TransportError};

/// Shared record of what a [`ScriptedTransport`] was asked to do.
#[derive(Debug, Default)]
pub struct TransportLog {
    sent: Mutex<Vec<Vec<u8>>>,
    closes: AtomicUsize,
}

impl TransportLog {
    /// Every buffer passed to `send()`, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `close()` was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// One scripted reply from `receive()`.
#[derive(Debug)]
pub enum Reply {
    /// These exact bytes.
    Bytes(Vec<u8>),
    /// An I/O failure.
    Fail,
}

impl From<Message> for Reply {
    fn from(msg: Message) -> Self {
        // The constructors only build payloads that fit the length field.
        Self::Bytes(encode_message(&msg).unwrap_or_default())
    }
}

/// A transport that replays canned replies.
#[derive(Debug)]
pub struct ScriptedTransport {
    replies: VecDeque<Reply>,
    log: Arc<TransportLog>,
    /// When `true`, every `send()` fails with an I/O error.
    pub should_fail_send: bool,
}

impl ScriptedTransport {
    pub fn new<I>(replies: I, log: Arc<TransportLog>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Reply>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            log,
            should_fail_send: false,
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.should_fail_send {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        self.log
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        match self.replies.pop_front() {
            Some(Reply::Bytes(bytes)) => Ok(bytes),
            Some(Reply::Fail) => {
                Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset).into())
            }
            None => Ok(Vec::new()),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out a single [`ScriptedTransport`], or fails when `should_fail` is set.
#[derive(Debug)]
pub struct ScriptedConnector {
    transport: Option<ScriptedTransport>,
    /// When `true`, `connect()` fails as if nobody were listening.
    pub should_fail: bool,
}

impl ScriptedConnector {
    pub fn new<I>(replies: I, log: Arc<TransportLog>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Reply>,
    {
        Self::from_transport(ScriptedTransport::new(replies, log))
    }

    pub fn from_transport(transport: ScriptedTransport) -> Self {
        Self {
            transport: Some(transport),
            should_fail: false,
        }
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn endpoint(&self) -> String {
        "scripted".to_string()
    }

    fn connect(&mut self) -> Result<ScriptedTransport, TransportError> {
        let refused = || TransportError::ConnectFailed {
            endpoint: "scripted".to_string(),
            attempts: 1,
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        if self.should_fail {
            return Err(refused());
        }
        self.transport.take().ok_or_else(refused)
    }
}
