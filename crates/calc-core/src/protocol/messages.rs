//! Message kinds, the `Message` value, and the frame layout constants.
//!
//! Every frame on the wire has the same shape:
//!
//! ```text
//! [kind:1][length:4][0xFF][payload:N][0xFF][crc32:4]
//! ```
//!
//! `length` is **not** the payload length: it counts everything after the
//! header, i.e. `N + 2×PADDING_SIZE + CHECKSUM_SIZE`.  All offsets are derived
//! from [`FrameLayout`] so encode and decode cannot drift apart.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use crate::protocol::checksum;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Size of the header: kind (1) + big-endian length field (4).
pub const HEADER_SIZE: usize = 5;

/// Size of each padding byte placed before and after the payload.
pub const PADDING_SIZE: usize = 1;

/// Value of the padding bytes.  Fixed-offset spacers, never delimiters.
pub const PADDING_BYTE: u8 = 0xFF;

/// Size of the trailing CRC-32.
pub const CHECKSUM_SIZE: usize = 4;

/// Bytes counted by the length field in addition to the payload itself.
pub const FRAMING_OVERHEAD: usize = 2 * PADDING_SIZE + CHECKSUM_SIZE;

/// Offset of the first payload byte.
pub const PAYLOAD_OFFSET: usize = HEADER_SIZE + PADDING_SIZE;

/// Smallest possible frame (empty payload).
pub const MIN_FRAME_LEN: usize = HEADER_SIZE + FRAMING_OVERHEAD;

// ── User-visible error texts ──────────────────────────────────────────────────

pub const GENERIC_ERROR_TEXT: &str = "Generic error message";
pub const OUT_OF_RANGE_TEXT: &str = "Result is too large";
pub const OVERFLOW_TEXT: &str = "Overflow or underflow error";
pub const UNKNOWN_ERROR_TEXT: &str = "Unknown error";

// ── Frame layout ──────────────────────────────────────────────────────────────

/// Byte offsets of every field in a frame carrying `payload_len` payload bytes.
///
/// Everything is computed from the one formula
/// `total = HEADER_SIZE + 2×PADDING_SIZE + payload_len + CHECKSUM_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    payload_len: usize,
}

impl FrameLayout {
    /// Layout of a frame carrying `payload_len` bytes.
    pub const fn for_payload(payload_len: usize) -> Self {
        Self { payload_len }
    }

    /// Recovers the layout from a received length field.
    ///
    /// Returns `None` when the field is too small to contain the padding and
    /// checksum (it would imply a negative payload length).
    pub fn from_length_field(length_field: u32) -> Option<Self> {
        (length_field as usize)
            .checked_sub(FRAMING_OVERHEAD)
            .map(Self::for_payload)
    }

    pub const fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Value written into the header's length field.
    pub const fn length_field(&self) -> usize {
        self.payload_len + FRAMING_OVERHEAD
    }

    /// Total number of bytes on the wire.
    pub const fn total_len(&self) -> usize {
        HEADER_SIZE + self.length_field()
    }

    pub const fn leading_pad_offset(&self) -> usize {
        HEADER_SIZE
    }

    pub fn payload_range(&self) -> Range<usize> {
        PAYLOAD_OFFSET..PAYLOAD_OFFSET + self.payload_len
    }

    pub const fn trailing_pad_offset(&self) -> usize {
        PAYLOAD_OFFSET + self.payload_len
    }

    pub fn checksum_range(&self) -> Range<usize> {
        let start = self.trailing_pad_offset() + PADDING_SIZE;
        start..start + CHECKSUM_SIZE
    }
}

// ── Message kinds ─────────────────────────────────────────────────────────────

/// The kind tag carried in the first byte of every frame.
///
/// Bytes outside the known set decode to [`MessageKind::Unrecognized`] so the
/// receiver can report an unexpected kind instead of failing to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Request expression (client → service) or decimal result (service → client).
    Data,
    /// Request accepted for processing.
    Ack,
    /// First message a service sends after accepting a connection.
    ServiceAnnouncement,
    /// Generic failure.
    Error,
    /// Operand or result outside the representable range (`ERANGE`).
    ErrorOutOfRange,
    /// Arithmetic overflow or underflow (`EOVERFLOW`).
    ErrorOverflow,
    /// Any other tag byte.
    Unrecognized(u8),
}

impl MessageKind {
    /// Returns `true` for the three peer-reported error kinds.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::ErrorOutOfRange | Self::ErrorOverflow)
    }

    /// Human-readable text shown to the user for an error response.
    pub const fn error_text(&self) -> &'static str {
        match self {
            Self::Error => GENERIC_ERROR_TEXT,
            Self::ErrorOutOfRange => OUT_OF_RANGE_TEXT,
            Self::ErrorOverflow => OVERFLOW_TEXT,
            _ => UNKNOWN_ERROR_TEXT,
        }
    }
}

impl From<u8> for MessageKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Data,
            1 => Self::Ack,
            2 => Self::ServiceAnnouncement,
            3 => Self::Error,
            34 => Self::ErrorOutOfRange,
            75 => Self::ErrorOverflow,
            other => Self::Unrecognized(other),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Data => 0,
            MessageKind::Ack => 1,
            MessageKind::ServiceAnnouncement => 2,
            MessageKind::Error => 3,
            MessageKind::ErrorOutOfRange => 34,
            MessageKind::ErrorOverflow => 75,
            MessageKind::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "Data"),
            Self::Ack => write!(f, "Ack"),
            Self::ServiceAnnouncement => write!(f, "ServiceAnnouncement"),
            Self::Error => write!(f, "Error"),
            Self::ErrorOutOfRange => write!(f, "ErrorOutOfRange"),
            Self::ErrorOverflow => write!(f, "ErrorOverflow"),
            Self::Unrecognized(raw) => write!(f, "Unrecognized({raw})"),
        }
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// One protocol message.
///
/// The payload length is always derived from the payload itself; the
/// checksum is computed when the message is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    payload: Vec<u8>,
    checksum: u32,
}

impl Message {
    /// Creates a message and computes the CRC-32 of `payload`.
    pub fn new(kind: MessageKind, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let checksum = checksum::crc32(&payload);
        Self {
            kind,
            payload,
            checksum,
        }
    }

    /// Rebuilds a received message, keeping the checksum read off the wire.
    pub(crate) fn from_wire(kind: MessageKind, payload: Vec<u8>, checksum: u32) -> Self {
        Self {
            kind,
            payload,
            checksum,
        }
    }

    /// A `Data` message carrying `text` as ASCII.
    pub fn data(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Data, text.into().into_bytes())
    }

    /// An empty `Ack`.
    pub fn ack() -> Self {
        Self::new(MessageKind::Ack, Vec::new())
    }

    /// An empty `ServiceAnnouncement`.
    pub fn service_announcement() -> Self {
        Self::new(MessageKind::ServiceAnnouncement, Vec::new())
    }

    /// An error response of `kind` with a human-readable payload.
    pub fn error(kind: MessageKind, text: impl Into<String>) -> Self {
        Self::new(kind, text.into().into_bytes())
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// The payload as text; invalid UTF-8 sequences are replaced.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Returns `true` when the stored checksum matches the payload.
    pub fn has_valid_checksum(&self) -> bool {
        checksum::verify(&self.payload, self.checksum)
    }

    /// Wire layout of this message.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::for_payload(self.payload.len())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
