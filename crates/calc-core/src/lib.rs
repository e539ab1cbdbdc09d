//! # calc-core
//!
//! Shared library for calc-link containing the framing codec, the message
//! model, and the arithmetic expression types used by both the client and the
//! service.
//!
//! It has zero dependencies on OS APIs or sockets: everything here operates on
//! byte slices and plain values, so both the blocking client and the async
//! service can share it.
//!
//! # Architecture overview
//!
//! calc-link lets a local client ask a peer service to evaluate
//! `<int><op><int>` expressions.  Each exchange is a sequence of small framed
//! messages on a Unix stream socket:
//!
//! ```text
//! client                              service
//! ──────                              ───────
//!         <── ServiceAnnouncement ──
//! Data("3+4") ──>
//!         <── Ack
//!         <── Data("7")  |  Error*(text)
//! ```
//!
//! - **`protocol`** – How bytes travel over the wire.  A message is framed as a
//!   5-byte header, a padded payload, and a trailing CRC-32 of the payload.
//!
//! - **`domain`** – The arithmetic expression model (`Expression`, `Operator`)
//!   and the single-client `AdmissionGate`.

pub mod domain;
pub mod protocol;

pub use domain::admission::{AdmissionError, AdmissionGate, AdmissionToken};
pub use domain::expression::{Expression, ExpressionError, Operator};
pub use protocol::codec::{
    decode_message, decode_message_with, encode_message, frame_len, ChecksumPolicy, FramingError,
};
pub use protocol::messages::{Message, MessageKind};
