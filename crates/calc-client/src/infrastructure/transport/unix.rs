//! Blocking Unix domain socket transport.
//!
//! The stream carries back-to-back frames with no delimiter, so
//! [`UnixTransport::receive`] reads the 5-byte header first, asks the codec
//! how long the whole frame is, then reads exactly the remainder.  Frames
//! longer than `max_frame_len` are refused before anything is allocated.

use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use calc_core::protocol::messages::HEADER_SIZE;
use calc_core::{frame_len, FramingError};
use tracing::{debug, info, warn};

use crate::application::ports::{Connector, Transport, TransportError};

/// Largest frame accepted when no limit is configured.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Connects to a service listening on a Unix socket path, retrying a fixed
/// number of times.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: PathBuf,
    attempts: u32,
    retry_delay: Duration,
    max_frame_len: usize,
}

impl UnixConnector {
    /// A connector that tries once and accepts frames up to
    /// [`DEFAULT_MAX_FRAME_LEN`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            attempts: 1,
            retry_delay: Duration::ZERO,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Tries up to `attempts` times (at least once), sleeping `delay` between
    /// failed attempts.
    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for UnixConnector {
    type Transport = UnixTransport;

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }

    fn connect(&mut self) -> Result<UnixTransport, TransportError> {
        let mut attempt = 1;
        loop {
            match UnixStream::connect(&self.path) {
                Ok(stream) => {
                    info!(path = %self.path.display(), attempt, "connected to service");
                    return Ok(UnixTransport::new(stream, self.max_frame_len));
                }
                Err(source) if attempt >= self.attempts => {
                    return Err(TransportError::ConnectFailed {
                        endpoint: self.endpoint(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        attempt,
                        "connect failed: {e}; retrying in {:?}",
                        self.retry_delay
                    );
                    thread::sleep(self.retry_delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// A connected Unix socket that exchanges whole frames.
#[derive(Debug)]
pub struct UnixTransport {
    stream: UnixStream,
    max_frame_len: usize,
}

impl UnixTransport {
    pub fn new(stream: UnixStream, max_frame_len: usize) -> Self {
        Self {
            stream,
            max_frame_len,
        }
    }
}

impl Transport for UnixTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        debug!(len = bytes.len(), "sent frame");
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut header = [0u8; HEADER_SIZE];
        match self.stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        let total = frame_len(&header)?;
        if total > self.max_frame_len {
            return Err(FramingError::FrameTooLarge {
                len: total,
                max: self.max_frame_len,
            }
            .into());
        }

        let mut frame = vec![0u8; total];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        self.stream
            .read_exact(&mut frame[HEADER_SIZE..])
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => TransportError::Closed,
                _ => TransportError::Io(e),
            })?;
        debug!(len = total, "received frame");
        Ok(frame)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::{decode_message, encode_message, Message, MessageKind};
    use std::os::unix::net::UnixListener;
    use uuid::Uuid;

    fn temp_socket_path() -> PathBuf {
        std::env::temp_dir().join(format!("calc_client_test_{}.sock", Uuid::new_v4()))
    }

    /// Binds a listener, runs `serve` on the first accepted stream in a thread,
    /// and returns a transport connected to it.
    fn serve_once<F>(serve: F) -> (UnixTransport, thread::JoinHandle<()>, PathBuf)
    where
        F: FnOnce(UnixStream) + Send + 'static,
    {
        let path = temp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve(stream);
        });
        let transport = UnixConnector::new(&path).connect().unwrap();
        (transport, handle, path)
    }

    #[test]
    fn test_receive_splits_back_to_back_frames() {
        // Arrange: the peer writes Ack and Data in a single write.
        let (mut transport, handle, path) = serve_once(|mut stream| {
            let mut bytes = encode_message(&Message::ack()).unwrap();
            bytes.extend(encode_message(&Message::data("7")).unwrap());
            stream.write_all(&bytes).unwrap();
        });

        // Act
        let first = transport.receive().unwrap();
        let second = transport.receive().unwrap();

        // Assert
        assert_eq!(decode_message(&first).unwrap().0.kind(), MessageKind::Ack);
        assert_eq!(decode_message(&second).unwrap().0.payload_text(), "7");
        handle.join().unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_receive_returns_empty_when_peer_closes() {
        let (mut transport, handle, path) = serve_once(drop);
        handle.join().unwrap();

        let bytes = transport.receive().unwrap();

        assert!(bytes.is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_receive_reports_closed_on_truncated_frame() {
        let (mut transport, handle, path) = serve_once(|mut stream| {
            let bytes = encode_message(&Message::data("12345")).unwrap();
            stream.write_all(&bytes[..bytes.len() - 2]).unwrap();
        });
        handle.join().unwrap();

        let result = transport.receive();

        assert!(matches!(result, Err(TransportError::Closed)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_receive_rejects_frame_above_limit() {
        // Arrange
        let path = temp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let bytes = encode_message(&Message::data("x".repeat(100))).unwrap();
            stream.write_all(&bytes).unwrap();
        });
        let mut transport = UnixConnector::new(&path)
            .with_max_frame_len(32)
            .connect()
            .unwrap();

        // Act
        let result = transport.receive();

        // Assert
        assert!(matches!(
            result,
            Err(TransportError::Framing(FramingError::FrameTooLarge { len: 111, max: 32 }))
        ));
        handle.join().unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_receive_rejects_undersized_length_field() {
        let (mut transport, handle, path) = serve_once(|mut stream| {
            stream.write_all(&[0x00, 0x00, 0x00, 0x00, 0x03]).unwrap();
        });

        let result = transport.receive();

        assert!(matches!(
            result,
            Err(TransportError::Framing(FramingError::LengthFieldTooSmall(3)))
        ));
        handle.join().unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_send_delivers_bytes_to_peer() {
        let (tx, rx) = std::sync::mpsc::channel();
        let (mut transport, handle, path) = serve_once(move |mut stream| {
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            tx.send(buf).unwrap();
        });

        transport.send(b"ping").unwrap();

        assert_eq!(&rx.recv().unwrap(), b"ping");
        handle.join().unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_close_twice_is_harmless() {
        let (mut transport, handle, path) = serve_once(drop);
        handle.join().unwrap();

        assert!(transport.close().is_ok());
        assert!(transport.close().is_ok());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_connect_reports_attempts_when_nobody_listens() {
        // Arrange
        let mut connector =
            UnixConnector::new(temp_socket_path()).with_retries(3, Duration::from_millis(1));

        // Act
        let result = connector.connect();

        // Assert
        match result {
            Err(TransportError::ConnectFailed { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_retries_still_tries_once() {
        let mut connector = UnixConnector::new(temp_socket_path()).with_retries(0, Duration::ZERO);

        match connector.connect() {
            Err(TransportError::ConnectFailed { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
    }
}
