//! Protocol module containing the message model, checksum, and the binary codec.

pub mod checksum;
pub mod codec;
pub mod messages;

pub use codec::{
    decode_message, decode_message_with, encode_message, frame_len, ChecksumPolicy, FramingError,
};
pub use messages::*;
