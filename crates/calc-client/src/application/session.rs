//! ClientSession: the client protocol state machine.
//!
//! # States (for beginners)
//!
//! ```text
//! Init ─► Connecting ─► AwaitAnnouncement ─► AwaitInput ──(exit)──► Closing ─► Done
//!                                              ▲     │
//!                                              │     ▼
//!                           AwaitResponse ◄─ AwaitAck ◄─ Sending
//!                                │
//!                                └──────────► back to AwaitInput
//! ```
//!
//! Every state may also end in `Error(reason)`.  `Done` and `Error` are
//! terminal.
//!
//! [`ClientSession::step`] performs exactly one transition, which makes each
//! phase testable on its own.  [`ClientSession::run`] steps until the session
//! is terminal and hands every [`SessionEvent`] to a callback.
//!
//! # Failures
//!
//! Anything that breaks the byte stream (a zero-byte read, an I/O error, a
//! frame that does not decode) or a message of the wrong kind where the
//! protocol requires a specific one is fatal: the transport is closed and the
//! session stops in `Error`.  Errors the *service* reports in reply to a
//! request (`Error`, `ErrorOutOfRange`, `ErrorOverflow`) are not fatal; they
//! are surfaced and the session asks for the next input.
//!
//! The transport is closed exactly once, whichever way the session ends,
//! including when the session is dropped mid-conversation.

use std::fmt;

use calc_core::{decode_message_with, encode_message, ChecksumPolicy, Message, MessageKind};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::ports::{ClientInput, Connector, InputSource, Transport, TransportError};

/// The message the session was waiting for when a protocol violation occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Announcement,
    Ack,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Announcement => f.write_str("unexpected message, expected announcement"),
            Self::Ack => f.write_str("expected ack"),
        }
    }
}

/// Why a session ended in [`ClientState::Error`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The stream failed, closed, or delivered bytes that do not decode.
    #[error("transport failure")]
    Transport(#[source] TransportError),

    /// A well-formed message arrived in a state that does not accept it.
    #[error("{expected}")]
    ProtocolViolation {
        expected: Expected,
        received: MessageKind,
    },
}

/// The session's position in the protocol.
#[derive(Debug)]
pub enum ClientState {
    Init,
    Connecting,
    AwaitAnnouncement,
    AwaitInput,
    /// Holds the request about to be written.
    Sending(Message),
    AwaitAck,
    AwaitResponse,
    Closing,
    Done,
    Error(SessionError),
}

impl ClientState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Something observable happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transport is connected.
    Connected { endpoint: String },
    /// The service announced itself; input can be requested.
    Announced,
    /// A request was written to the transport; carries the payload text.
    RequestSent(String),
    /// The service accepted the request.
    Acknowledged,
    /// The service computed a result.
    Result(String),
    /// The service reported an error for the request.
    ServiceError { kind: MessageKind, message: String },
    /// The service replied with a kind that is neither a result nor an error.
    UnexpectedResponse(MessageKind),
    /// The session ended normally.
    Closed,
    /// The session ended on a fatal error.
    Failed(String),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { endpoint } => write!(f, "Connected to {endpoint}"),
            Self::Announced => f.write_str("Service ready"),
            Self::RequestSent(text) => write!(f, "Sent {text}"),
            Self::Acknowledged => f.write_str("Request acknowledged"),
            Self::Result(value) => write!(f, "Result: {value}"),
            Self::ServiceError { message, .. } => write!(f, "Error: {message}"),
            Self::UnexpectedResponse(kind) => {
                write!(f, "Unexpected response from service: {kind}")
            }
            Self::Closed => f.write_str("Connection closed"),
            Self::Failed(reason) => write!(f, "Session failed: {reason}"),
        }
    }
}

type Transition = (ClientState, Option<SessionEvent>);

/// One client conversation with a calc-link service.
pub struct ClientSession<C: Connector, I> {
    id: Uuid,
    connector: C,
    input: I,
    policy: ChecksumPolicy,
    state: ClientState,
    endpoint: String,
    transport: Option<C::Transport>,
}

impl<C, I> ClientSession<C, I>
where
    C: Connector,
    I: InputSource,
{
    /// Creates a session in [`ClientState::Init`] that verifies checksums.
    pub fn new(connector: C, input: I) -> Self {
        Self {
            id: Uuid::new_v4(),
            connector,
            input,
            policy: ChecksumPolicy::Verify,
            state: ClientState::Init,
            endpoint: String::new(),
            transport: None,
        }
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The reason the session failed, once it is in [`ClientState::Error`].
    pub fn failure(&self) -> Option<&SessionError> {
        match &self.state {
            ClientState::Error(err) => Some(err),
            _ => None,
        }
    }

    /// The request about to be sent, while the session is in `Sending`.
    pub fn pending_request(&self) -> Option<&Message> {
        match &self.state {
            ClientState::Sending(msg) => Some(msg),
            _ => None,
        }
    }

    /// Performs one transition.  Stepping a terminal session does nothing.
    pub fn step(&mut self) -> Option<SessionEvent> {
        if self.is_terminal() {
            return None;
        }
        let current = std::mem::replace(&mut self.state, ClientState::Done);
        match self.advance(current) {
            Ok((next, event)) => {
                debug!(session = %self.id, state = ?next, "transition");
                self.state = next;
                event
            }
            Err(err) => {
                error!(session = %self.id, error = %err, detail = ?err, "session failed");
                self.release();
                let event = SessionEvent::Failed(err.to_string());
                self.state = ClientState::Error(err);
                Some(event)
            }
        }
    }

    /// Steps until the session is terminal, passing each event to `on_event`.
    pub fn run<F>(&mut self, mut on_event: F) -> &ClientState
    where
        F: FnMut(&SessionEvent),
    {
        while !self.is_terminal() {
            if let Some(event) = self.step() {
                on_event(&event);
            }
        }
        &self.state
    }

    fn advance(&mut self, state: ClientState) -> Result<Transition, SessionError> {
        match state {
            ClientState::Init => {
                self.endpoint = self.connector.endpoint();
                info!(session = %self.id, endpoint = %self.endpoint, "starting session");
                Ok((ClientState::Connecting, None))
            }

            ClientState::Connecting => {
                let transport = self.connector.connect().map_err(SessionError::Transport)?;
                self.transport = Some(transport);
                let event = SessionEvent::Connected {
                    endpoint: self.endpoint.clone(),
                };
                Ok((ClientState::AwaitAnnouncement, Some(event)))
            }

            ClientState::AwaitAnnouncement => match self.receive()?.kind() {
                MessageKind::ServiceAnnouncement => {
                    Ok((ClientState::AwaitInput, Some(SessionEvent::Announced)))
                }
                other => Err(SessionError::ProtocolViolation {
                    expected: Expected::Announcement,
                    received: other,
                }),
            },

            ClientState::AwaitInput => match self.input.next_input() {
                ClientInput::Exit => Ok((ClientState::Closing, None)),
                ClientInput::Request(expr) => {
                    Ok((ClientState::Sending(Message::data(expr.to_string())), None))
                }
                ClientInput::Raw(text) => Ok((ClientState::Sending(Message::data(text)), None)),
            },

            ClientState::Sending(msg) => {
                let bytes = encode_message(&msg)
                    .map_err(|e| SessionError::Transport(TransportError::Framing(e)))?;
                self.transport()?
                    .send(&bytes)
                    .map_err(SessionError::Transport)?;
                let text = msg.payload_text().into_owned();
                debug!(session = %self.id, request = %text, "request sent");
                Ok((ClientState::AwaitAck, Some(SessionEvent::RequestSent(text))))
            }

            ClientState::AwaitAck => match self.receive()?.kind() {
                MessageKind::Ack => Ok((
                    ClientState::AwaitResponse,
                    Some(SessionEvent::Acknowledged),
                )),
                other => Err(SessionError::ProtocolViolation {
                    expected: Expected::Ack,
                    received: other,
                }),
            },

            ClientState::AwaitResponse => {
                let msg = self.receive()?;
                let event = match msg.kind() {
                    MessageKind::Data => SessionEvent::Result(msg.payload_text().into_owned()),
                    kind if kind.is_error() => {
                        debug!(
                            session = %self.id,
                            %kind,
                            payload = %msg.payload_text(),
                            "service reported error"
                        );
                        SessionEvent::ServiceError {
                            kind,
                            message: kind.error_text().to_string(),
                        }
                    }
                    other => {
                        warn!(session = %self.id, kind = %other, "unexpected response kind");
                        SessionEvent::UnexpectedResponse(other)
                    }
                };
                Ok((ClientState::AwaitInput, Some(event)))
            }

            ClientState::Closing => {
                self.release();
                info!(session = %self.id, "session closed");
                Ok((ClientState::Done, Some(SessionEvent::Closed)))
            }

            terminal @ (ClientState::Done | ClientState::Error(_)) => Ok((terminal, None)),
        }
    }

    fn transport(&mut self) -> Result<&mut C::Transport, SessionError> {
        self.transport
            .as_mut()
            .ok_or(SessionError::Transport(TransportError::Closed))
    }

    /// Receives and decodes one message.  A zero-byte read counts as the
    /// peer closing the stream.
    fn receive(&mut self) -> Result<Message, SessionError> {
        let policy = self.policy;
        let bytes = self
            .transport()?
            .receive()
            .map_err(SessionError::Transport)?;
        if bytes.is_empty() {
            return Err(SessionError::Transport(TransportError::Closed));
        }
        let (msg, _) = decode_message_with(&bytes, policy)
            .map_err(|e| SessionError::Transport(TransportError::Framing(e)))?;
        debug!(session = %self.id, kind = %msg.kind(), len = msg.payload_len(), "received");
        Ok(msg)
    }
}

impl<C: Connector, I> ClientSession<C, I> {
    /// Closes the transport if the session still holds it.
    fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!(session = %self.id, "error closing transport: {e}");
            }
        }
    }
}

impl<C: Connector, I> Drop for ClientSession<C, I> {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
