//! Integration tests for the calc-core wire codec.
//!
//! These tests drive the public API only: messages built with the
//! constructors are encoded, decoded back, and compared, and arbitrary byte
//! input is fed to the decoder to check it fails cleanly instead of panicking.

use calc_core::protocol::checksum::crc32;
use calc_core::protocol::messages::{FRAMING_OVERHEAD, HEADER_SIZE, MIN_FRAME_LEN, PADDING_BYTE};
use calc_core::{
    decode_message, decode_message_with, encode_message, frame_len, ChecksumPolicy, Expression,
    FramingError, Message, MessageKind, Operator,
};
use proptest::prelude::*;

/// Encodes a message and decodes it again, asserting the whole frame is used.
fn roundtrip(msg: &Message) -> Message {
    let bytes = encode_message(msg).expect("encode must succeed");
    let (decoded, consumed) = decode_message(&bytes).expect("decode must succeed");
    assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
    decoded
}

#[test]
fn test_roundtrip_request_built_from_expression() {
    // Arrange
    let expr = Expression::new(3, Operator::Add, 4);
    let original = Message::data(expr.to_string());

    // Act
    let decoded = roundtrip(&original);

    // Assert
    assert_eq!(decoded, original);
    assert_eq!(decoded.payload_text().parse::<Expression>(), Ok(expr));
}

#[test]
fn test_roundtrip_every_protocol_message() {
    let messages = [
        Message::service_announcement(),
        Message::ack(),
        Message::data("7"),
        Message::error(MessageKind::Error, MessageKind::Error.error_text()),
        Message::error(
            MessageKind::ErrorOutOfRange,
            MessageKind::ErrorOutOfRange.error_text(),
        ),
        Message::error(
            MessageKind::ErrorOverflow,
            MessageKind::ErrorOverflow.error_text(),
        ),
    ];

    for original in &messages {
        assert_eq!(&roundtrip(original), original);
    }
}

#[test]
fn test_back_to_back_frames_decode_in_order() {
    // Arrange: Ack followed by the result, as one read might deliver them.
    let mut stream = encode_message(&Message::ack()).unwrap();
    stream.extend(encode_message(&Message::data("7")).unwrap());

    // Act
    let (first, used) = decode_message(&stream).unwrap();
    let (second, rest) = decode_message(&stream[used..]).unwrap();

    // Assert
    assert_eq!(first.kind(), MessageKind::Ack);
    assert_eq!(second.payload_text(), "7");
    assert_eq!(used + rest, stream.len());
}

#[test]
fn test_stream_reader_can_size_frame_from_header() {
    let bytes = encode_message(&Message::data("2147483647*2")).unwrap();

    let total = frame_len(&bytes[..HEADER_SIZE]).unwrap();

    assert_eq!(total, bytes.len());
}

#[test]
fn test_corrupted_payload_is_only_accepted_when_checks_are_off() {
    // Arrange
    let mut bytes = encode_message(&Message::data("3+4")).unwrap();
    bytes[HEADER_SIZE + 1] = b'9';

    // Act
    let strict = decode_message(&bytes);
    let lenient = decode_message_with(&bytes, ChecksumPolicy::Ignore);

    // Assert
    assert!(matches!(strict, Err(FramingError::ChecksumMismatch { .. })));
    let (msg, _) = lenient.unwrap();
    assert_eq!(msg.payload_text(), "9+4");
    assert!(!msg.has_valid_checksum());
}

fn any_kind() -> impl Strategy<Value = MessageKind> {
    any::<u8>().prop_map(MessageKind::from)
}

proptest! {
    #[test]
    fn prop_roundtrip_preserves_kind_and_payload(
        kind in any_kind(),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let original = Message::new(kind, payload);
        prop_assert_eq!(roundtrip(&original), original);
    }

    #[test]
    fn prop_frame_layout_matches_payload(
        kind in any_kind(),
        payload in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let bytes = encode_message(&Message::new(kind, payload.clone())).unwrap();
        let n = payload.len();

        prop_assert_eq!(bytes.len(), MIN_FRAME_LEN + n);
        let length_field = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        prop_assert_eq!(length_field as usize, n + FRAMING_OVERHEAD);
        prop_assert_eq!(bytes[HEADER_SIZE], PADDING_BYTE);
        prop_assert_eq!(bytes[HEADER_SIZE + 1 + n], PADDING_BYTE);
        let sum = u32::from_be_bytes([
            bytes[n + 7], bytes[n + 8], bytes[n + 9], bytes[n + 10],
        ]);
        prop_assert_eq!(sum, crc32(&payload));
    }

    #[test]
    fn prop_every_strict_prefix_is_insufficient(
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = encode_message(&Message::new(MessageKind::Data, payload)).unwrap();
        let end = cut.index(bytes.len());

        let result = decode_message(&bytes[..end]);

        prop_assert!(
            matches!(result, Err(FramingError::InsufficientData { .. })),
            "prefix of {} bytes gave {:?}", end, result
        );
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(
        bytes in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let _ = decode_message(&bytes);
        let _ = decode_message_with(&bytes, ChecksumPolicy::Ignore);
    }
}
