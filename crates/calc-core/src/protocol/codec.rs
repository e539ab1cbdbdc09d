//! Binary codec for encoding and decoding calc-link protocol messages.
//!
//! Wire format:
//! ```text
//! [kind:1][length:4][0xFF][payload:N][0xFF][crc32:4]
//! ```
//! `length = N + 6`.  All multi-byte integers are big-endian.  The padding
//! bytes are written on encode but never inspected on decode.

use thiserror::Error;
use tracing::debug;

use crate::protocol::checksum;
use crate::protocol::messages::{FrameLayout, Message, MessageKind, HEADER_SIZE, PADDING_BYTE};

/// Errors that can occur while framing or unframing a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The byte slice ends before the header or the declared frame end.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The length field cannot cover the padding and checksum, so the
    /// payload length would be negative.
    #[error("length field {0} is smaller than the 6-byte framing overhead")]
    LengthFieldTooSmall(u32),

    /// A stream reader refused a frame above its configured limit.
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The payload is too long for the 32-bit length field.
    #[error("payload of {0} bytes does not fit the length field")]
    PayloadTooLarge(usize),

    /// The trailing checksum does not match the received payload.
    #[error(
        "checksum mismatch: frame carries 0x{received:08X}, payload hashes to 0x{computed:08X}"
    )]
    ChecksumMismatch { received: u32, computed: u32 },
}

/// Whether [`decode_message_with`] compares the received checksum with a
/// fresh CRC-32 of the received payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Reject frames whose checksum does not match.
    #[default]
    Verify,
    /// Accept the frame and keep the received checksum as-is.
    Ignore,
}

impl ChecksumPolicy {
    /// Maps a `verify_checksum` configuration flag to a policy.
    pub fn from_flag(verify: bool) -> Self {
        if verify {
            Self::Verify
        } else {
            Self::Ignore
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into its complete wire frame.
///
/// # Errors
///
/// Returns [`FramingError::PayloadTooLarge`] if the payload cannot be
/// described by the 32-bit length field.
///
/// # Examples
///
/// ```rust
/// use calc_core::{decode_message, encode_message, Message};
///
/// let msg = Message::data("3+4");
/// let bytes = encode_message(&msg).unwrap();
/// assert_eq!(bytes.len(), 14);
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, FramingError> {
    let layout = msg.layout();
    let length_field = u32::try_from(layout.length_field())
        .map_err(|_| FramingError::PayloadTooLarge(msg.payload_len()))?;

    let mut buf = Vec::with_capacity(layout.total_len());

    // Header: kind (1) + length (4)
    buf.push(u8::from(msg.kind()));
    buf.extend_from_slice(&length_field.to_be_bytes());

    buf.push(PADDING_BYTE);
    buf.extend_from_slice(msg.payload());
    buf.push(PADDING_BYTE);

    buf.extend_from_slice(&msg.checksum().to_be_bytes());

    debug_assert_eq!(buf.len(), layout.total_len());
    Ok(buf)
}

/// Decodes one [`Message`] from the beginning of `bytes`, verifying the
/// checksum.
///
/// Returns the decoded message and the number of bytes consumed, so the
/// caller can advance a read cursor.
///
/// # Errors
///
/// Returns [`FramingError`] if the bytes are truncated, the length field is
/// below the framing overhead, or the checksum does not match.
pub fn decode_message(bytes: &[u8]) -> Result<(Message, usize), FramingError> {
    decode_message_with(bytes, ChecksumPolicy::Verify)
}

/// Decodes one [`Message`] from the beginning of `bytes` under `policy`.
///
/// # Errors
///
/// As [`decode_message`]; [`FramingError::ChecksumMismatch`] is only
/// returned under [`ChecksumPolicy::Verify`].
pub fn decode_message_with(
    bytes: &[u8],
    policy: ChecksumPolicy,
) -> Result<(Message, usize), FramingError> {
    let layout = read_layout(bytes)?;

    let total = layout.total_len();
    if bytes.len() < total {
        return Err(FramingError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }

    let kind = MessageKind::from(bytes[0]);
    let payload = bytes[layout.payload_range()].to_vec();
    let received = read_u32(bytes, layout.checksum_range().start)?;

    if policy == ChecksumPolicy::Verify {
        let computed = checksum::crc32(&payload);
        if computed != received {
            debug!(%kind, received, computed, "rejecting frame with bad checksum");
            return Err(FramingError::ChecksumMismatch { received, computed });
        }
    }

    Ok((Message::from_wire(kind, payload, received), total))
}

/// Reads the header at the start of `header` and returns the total length of
/// the frame it introduces.
///
/// Stream readers call this after reading [`HEADER_SIZE`] bytes to learn how
/// many more bytes belong to the frame.
///
/// # Errors
///
/// Returns [`FramingError::InsufficientData`] for a short header and
/// [`FramingError::LengthFieldTooSmall`] for a length below the overhead.
pub fn frame_len(header: &[u8]) -> Result<usize, FramingError> {
    read_layout(header).map(|layout| layout.total_len())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_layout(bytes: &[u8]) -> Result<FrameLayout, FramingError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FramingError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }
    let length_field = read_u32(bytes, 1)?;
    FrameLayout::from_length_field(length_field)
        .ok_or(FramingError::LengthFieldTooSmall(length_field))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, FramingError> {
    if buf.len() < offset + 4 {
        return Err(FramingError::InsufficientData {
            needed: offset + 4,
            available: buf.len(),
        });
    }
    Ok(u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
