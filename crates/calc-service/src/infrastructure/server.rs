//! Unix socket server: accept loop and per-connection frame loop.
//!
//! This module is responsible for:
//!
//! 1. Binding a Unix listener on the configured path, replacing a stale
//!    socket file left by a previous run.
//! 2. Accepting connections and handing each to its own Tokio task.
//! 3. Admitting one client at a time.  A client that arrives while another
//!    is being served gets a single `Error("Service busy")` and is closed.
//! 4. Sending the `ServiceAnnouncement`, then answering each frame with the
//!    replies built by [`respond`].
//! 5. Dropping clients that stay silent longer than the configured timeout.
//! 6. Stopping when the `running` flag is cleared and removing the socket
//!    file.
//!
//! # Frame reading
//!
//! Frames arrive back-to-back with no delimiter.  [`read_frame`] reads the
//! 5-byte header, asks the codec for the total frame length, refuses frames
//! above `max_frame_len`, then reads exactly the rest.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use calc_core::protocol::messages::HEADER_SIZE;
use calc_core::{
    encode_message, frame_len, AdmissionError, AdmissionGate, ChecksumPolicy, FramingError,
    Message, MessageKind,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::calculator::{Calculator, CheckedCalculator};
use crate::application::handle_request::{respond, SERVICE_BUSY_TEXT};
use crate::infrastructure::config::ServiceConfig;

/// How often the accept loop re-checks the `running` flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for the server and its connections.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

/// How a connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// The client closed the stream.
    ClientClosed,
    /// The client sent nothing for longer than the timeout.
    TimedOut,
    /// Another client held the service; this one was turned away.
    Busy,
}

/// Everything a connection task needs, shared by all connections.
pub struct ConnectionContext {
    pub gate: AdmissionGate,
    pub calculator: Arc<dyn Calculator>,
    pub policy: ChecksumPolicy,
    pub max_frame_len: usize,
    pub client_timeout: Duration,
}

impl ConnectionContext {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            gate: AdmissionGate::new(),
            calculator: Arc::new(CheckedCalculator),
            policy: ChecksumPolicy::from_flag(config.verify_checksum),
            max_frame_len: config.max_frame_len,
            client_timeout: config.client_timeout(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound calc-link service.
pub struct CalcServer {
    listener: UnixListener,
    path: PathBuf,
    context: ConnectionContext,
}

impl CalcServer {
    /// Binds the listener at `config.socket_path`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bind`] if a stale socket file cannot be
    /// removed or the listener cannot be bound.
    pub fn bind(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let path = config.socket_path.clone();
        let bind_err = |source| ServiceError::Bind {
            path: path.clone(),
            source,
        };

        match std::fs::remove_file(&path) {
            Ok(()) => warn!(path = %path.display(), "removed stale socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(bind_err(e)),
        }
        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        info!(path = %path.display(), "calc-link service listening");

        Ok(Self {
            listener,
            path,
            context: ConnectionContext::from_config(config),
        })
    }

    /// Replaces the calculator used to evaluate requests.
    pub fn with_calculator(mut self, calculator: Arc<dyn Calculator>) -> Self {
        self.context.calculator = calculator;
        self
    }

    pub fn with_client_timeout(mut self, client_timeout: Duration) -> Self {
        self.context.client_timeout = client_timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }

    /// A handle to the server's admission gate.
    pub fn admission(&self) -> AdmissionGate {
        self.context.gate.clone()
    }

    /// Runs the accept loop until `running` is set to `false`, then removes
    /// the socket file.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Io`] if the socket file cannot be removed on
    /// shutdown.
    pub async fn run(self, running: Arc<AtomicBool>) -> Result<(), ServiceError> {
        let Self {
            listener,
            path,
            context,
        } = self;
        let context = Arc::new(context);

        while running.load(Ordering::Relaxed) {
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, _addr))) => {
                    let ctx = Arc::clone(&context);
                    tokio::spawn(async move {
                        handle_connection(stream, ctx).await;
                    });
                }
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        }

        info!("shutdown flag set; stopping accept loop");
        drop(listener);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection<S>(stream: S, context: Arc<ConnectionContext>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = Uuid::new_v4();
    info!(connection = %id, "client connected");
    match serve_connection(stream, &context, id).await {
        Ok(end) => info!(connection = %id, ?end, "connection finished"),
        Err(e) => warn!(connection = %id, "connection closed with error: {e}"),
    }
}

/// Runs one connection from admission to close.
///
/// The admission token is held for the whole conversation and released when
/// this function returns, whichever way it returns.
///
/// # Errors
///
/// Returns [`ServiceError`] when the stream fails or delivers a frame that
/// cannot be read.
pub async fn serve_connection<S>(
    mut stream: S,
    context: &ConnectionContext,
    id: Uuid,
) -> Result<ConnectionEnd, ServiceError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _token = match context.gate.try_acquire() {
        Ok(token) => token,
        Err(AdmissionError::Busy) => {
            info!(connection = %id, "service busy; turning client away");
            write_message(&mut stream, &Message::error(MessageKind::Error, SERVICE_BUSY_TEXT))
                .await?;
            return Ok(ConnectionEnd::Busy);
        }
    };

    write_message(&mut stream, &Message::service_announcement()).await?;

    loop {
        let frame = match timeout(
            context.client_timeout,
            read_frame(&mut stream, context.max_frame_len),
        )
        .await
        {
            Err(_) => {
                info!(connection = %id, timeout = ?context.client_timeout, "client idle; closing");
                return Ok(ConnectionEnd::TimedOut);
            }
            Ok(result) => match result? {
                Some(frame) => frame,
                None => return Ok(ConnectionEnd::ClientClosed),
            },
        };

        for reply in respond(&frame, context.policy, context.calculator.as_ref())? {
            debug!(connection = %id, kind = %reply.kind(), "reply");
            write_message(&mut stream, &reply).await?;
        }
    }
}

/// Reads one whole frame.  Returns `None` when the stream ends before a new
/// frame starts.
///
/// # Errors
///
/// Returns [`ServiceError::Framing`] for an undersized length field or a
/// frame above `max_frame_len`, and [`ServiceError::Io`] if the stream ends
/// mid-frame or fails.
pub async fn read_frame<R>(
    reader: &mut R,
    max_frame_len: usize,
) -> Result<Option<Vec<u8>>, ServiceError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let total = frame_len(&header)?;
    if total > max_frame_len {
        return Err(FramingError::FrameTooLarge {
            len: total,
            max: max_frame_len,
        }
        .into());
    }

    let mut frame = vec![0u8; total];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_SIZE..]).await?;
    Ok(Some(frame))
}

async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<(), ServiceError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_message(msg)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn bytes(msg: &Message) -> Vec<u8> {
        encode_message(msg).unwrap()
    }

    fn context() -> ConnectionContext {
        ConnectionContext::from_config(&ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_announces_then_answers_request() {
        // Arrange
        let stream = Builder::new()
            .write(&bytes(&Message::service_announcement()))
            .read(&bytes(&Message::data("3+4")))
            .write(&bytes(&Message::ack()))
            .write(&bytes(&Message::data("7")))
            .build();
        let ctx = context();

        // Act
        let end = serve_connection(stream, &ctx, Uuid::new_v4()).await.unwrap();

        // Assert
        assert_eq!(end, ConnectionEnd::ClientClosed);
        assert!(!ctx.gate.is_occupied(), "token must be released");
    }

    #[tokio::test]
    async fn test_answers_several_requests_in_order() {
        let overflow = Message::error(MessageKind::ErrorOverflow, "Overflow or underflow error");
        let stream = Builder::new()
            .write(&bytes(&Message::service_announcement()))
            .read(&bytes(&Message::data("2147483647*2")))
            .write(&bytes(&Message::ack()))
            .write(&bytes(&overflow))
            .read(&bytes(&Message::data("10/3")))
            .write(&bytes(&Message::ack()))
            .write(&bytes(&Message::data("3")))
            .build();

        let end = serve_connection(stream, &context(), Uuid::new_v4()).await.unwrap();

        assert_eq!(end, ConnectionEnd::ClientClosed);
    }

    #[tokio::test]
    async fn test_busy_service_sends_single_error() {
        // Arrange
        let ctx = context();
        let _held = ctx.gate.try_acquire().unwrap();
        let stream = Builder::new()
            .write(&bytes(&Message::error(MessageKind::Error, SERVICE_BUSY_TEXT)))
            .build();

        // Act
        let end = serve_connection(stream, &ctx, Uuid::new_v4()).await.unwrap();

        // Assert
        assert_eq!(end, ConnectionEnd::Busy);
        assert!(ctx.gate.is_occupied(), "the first client keeps its slot");
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut ctx = context();
        ctx.max_frame_len = 16;
        let stream = Builder::new()
            .write(&bytes(&Message::service_announcement()))
            .read(&[0x00, 0x00, 0x00, 0x10, 0x00])
            .build();

        let result = serve_connection(stream, &ctx, Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(ServiceError::Framing(FramingError::FrameTooLarge { .. }))
        ));
        assert!(!ctx.gate.is_occupied());
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        // Arrange
        let (server_side, mut client_side) = tokio::net::UnixStream::pair().unwrap();
        let mut ctx = context();
        ctx.client_timeout = Duration::from_millis(50);

        // Act
        let end = serve_connection(server_side, &ctx, Uuid::new_v4()).await.unwrap();

        // Assert
        assert_eq!(end, ConnectionEnd::TimedOut);
        let announcement = read_frame(&mut client_side, 64).await.unwrap().unwrap();
        assert_eq!(announcement, bytes(&Message::service_announcement()));
    }

    #[tokio::test]
    async fn test_read_frame_returns_none_on_clean_eof() {
        let mut stream = Builder::new().build();

        let frame = read_frame(&mut stream, 64).await.unwrap();

        assert_eq!(frame, None);
    }

    #[tokio::test]
    async fn test_read_frame_splits_back_to_back_frames() {
        let mut both = bytes(&Message::ack());
        both.extend(bytes(&Message::data("42")));
        let mut stream = Builder::new().read(&both).build();

        let first = read_frame(&mut stream, 64).await.unwrap().unwrap();
        let second = read_frame(&mut stream, 64).await.unwrap().unwrap();

        assert_eq!(first, bytes(&Message::ack()));
        assert_eq!(second, bytes(&Message::data("42")));
    }

    #[tokio::test]
    async fn test_read_frame_mid_frame_eof_is_io_error() {
        let full = bytes(&Message::data("123"));
        let mut stream = Builder::new().read(&full[..full.len() - 3]).build();

        let result = read_frame(&mut stream, 64).await;

        assert!(matches!(result, Err(ServiceError::Io(_))));
    }
}
