//! Turns one received frame into the replies the service sends.
//!
//! | Received | Replies |
//! |---|---|
//! | `Data` that evaluates | `Ack`, `Data(result)` |
//! | `Data` that fails to evaluate | `Ack`, `Error*` for the failure |
//! | `Data` with a bad checksum (when verifying) | `Error` |
//! | any other kind | `Error` |
//!
//! Errors carry the human-readable text for their kind as payload.

use calc_core::{decode_message_with, ChecksumPolicy, FramingError, Message, MessageKind};
use tracing::{debug, warn};

use super::calculator::Calculator;

/// Payload of the `Error` sent for a request whose checksum does not match.
pub const CHECKSUM_MISMATCH_TEXT: &str = "Checksum mismatch";

/// Payload of the `Error` sent for a message that is not a request.
pub const NOT_A_REQUEST_TEXT: &str = "Expected a Data request";

/// Payload of the `Error` sent instead of the announcement when another
/// client is already being served.
pub const SERVICE_BUSY_TEXT: &str = "Service busy";

/// Builds the replies to one complete frame.
///
/// # Errors
///
/// Returns [`FramingError`] when `frame` is not a complete frame.  A checksum
/// mismatch is not an error here; it is answered with an `Error` reply.
pub fn respond(
    frame: &[u8],
    policy: ChecksumPolicy,
    calculator: &dyn Calculator,
) -> Result<Vec<Message>, FramingError> {
    let request = match decode_message_with(frame, policy) {
        Ok((msg, _)) => msg,
        Err(FramingError::ChecksumMismatch { received, computed }) => {
            warn!(received, computed, "request failed checksum verification");
            return Ok(vec![Message::error(MessageKind::Error, CHECKSUM_MISMATCH_TEXT)]);
        }
        Err(e) => return Err(e),
    };

    if request.kind() != MessageKind::Data {
        warn!(kind = %request.kind(), "ignoring non-request message");
        return Ok(vec![Message::error(MessageKind::Error, NOT_A_REQUEST_TEXT)]);
    }

    let expression = request.payload_text();
    let reply = match calculator.evaluate(&expression) {
        Ok(value) => {
            debug!(%expression, value, "evaluated");
            Message::data(value.to_string())
        }
        Err(e) => {
            debug!(%expression, error = %e, "evaluation failed");
            let kind = e.message_kind();
            Message::error(kind, kind.error_text())
        }
    };
    Ok(vec![Message::ack(), reply])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::calculator::{CalcError, CheckedCalculator, MockCalculator};
    use calc_core::encode_message;

    fn frame(msg: &Message) -> Vec<u8> {
        encode_message(msg).unwrap()
    }

    fn kinds(replies: &[Message]) -> Vec<MessageKind> {
        replies.iter().map(Message::kind).collect()
    }

    #[test]
    fn test_request_gets_ack_then_result() {
        // Arrange
        let request = frame(&Message::data("3+4"));

        // Act
        let replies = respond(&request, ChecksumPolicy::Verify, &CheckedCalculator).unwrap();

        // Assert
        assert_eq!(kinds(&replies), [MessageKind::Ack, MessageKind::Data]);
        assert!(replies[0].payload().is_empty());
        assert_eq!(replies[1].payload_text(), "7");
    }

    #[test]
    fn test_failed_evaluation_gets_ack_then_error_kind() {
        for (expr, kind, text) in [
            ("2147483647*2", MessageKind::ErrorOverflow, "Overflow or underflow error"),
            ("9999999999+1", MessageKind::ErrorOutOfRange, "Result is too large"),
            ("a+b", MessageKind::Error, "Generic error message"),
        ] {
            let replies =
                respond(&frame(&Message::data(expr)), ChecksumPolicy::Verify, &CheckedCalculator)
                    .unwrap();

            assert_eq!(kinds(&replies), [MessageKind::Ack, kind], "{expr}");
            assert_eq!(replies[1].payload_text(), text);
        }
    }

    #[test]
    fn test_non_request_kind_gets_single_error() {
        for msg in [
            Message::ack(),
            Message::service_announcement(),
            Message::new(MessageKind::Unrecognized(42), b"3+4".to_vec()),
        ] {
            let replies =
                respond(&frame(&msg), ChecksumPolicy::Verify, &CheckedCalculator).unwrap();

            assert_eq!(kinds(&replies), [MessageKind::Error]);
            assert_eq!(replies[0].payload_text(), NOT_A_REQUEST_TEXT);
        }
    }

    #[test]
    fn test_checksum_mismatch_gets_error_without_ack() {
        // Arrange
        let mut request = frame(&Message::data("3+4"));
        let last = request.len() - 1;
        request[last] ^= 0x01;

        // Act
        let replies = respond(&request, ChecksumPolicy::Verify, &CheckedCalculator).unwrap();

        // Assert
        assert_eq!(kinds(&replies), [MessageKind::Error]);
        assert_eq!(replies[0].payload_text(), CHECKSUM_MISMATCH_TEXT);
    }

    #[test]
    fn test_checksum_mismatch_is_evaluated_when_ignored() {
        let mut request = frame(&Message::data("3+4"));
        let last = request.len() - 1;
        request[last] ^= 0x01;

        let replies = respond(&request, ChecksumPolicy::Ignore, &CheckedCalculator).unwrap();

        assert_eq!(kinds(&replies), [MessageKind::Ack, MessageKind::Data]);
    }

    #[test]
    fn test_truncated_frame_is_framing_error() {
        let request = frame(&Message::data("3+4"));

        let truncated = &request[..request.len() - 1];

        let result = respond(truncated, ChecksumPolicy::Verify, &CheckedCalculator);

        assert!(matches!(result, Err(FramingError::InsufficientData { .. })));
    }

    #[test]
    fn test_calculator_receives_payload_text() {
        // Arrange
        let mut calculator = MockCalculator::new();
        calculator
            .expect_evaluate()
            .withf(|expr| expr.to_string() == "6*7")
            .times(1)
            .returning(|_| Ok(42));

        // Act
        let replies =
            respond(&frame(&Message::data("6*7")), ChecksumPolicy::Verify, &calculator).unwrap();

        // Assert
        assert_eq!(replies[1].payload_text(), "42");
    }

    #[test]
    fn test_calculator_is_not_called_for_bad_checksum() {
        let mut calculator = MockCalculator::new();
        calculator.expect_evaluate().never();
        let mut request = frame(&Message::data("1+1"));
        request[6] = b'2';

        let replies = respond(&request, ChecksumPolicy::Verify, &calculator).unwrap();

        assert_eq!(kinds(&replies), [MessageKind::Error]);
    }

    #[test]
    fn test_calculator_error_kind_is_forwarded() {
        let mut calculator = MockCalculator::new();
        calculator
            .expect_evaluate()
            .returning(|_| Err(CalcError::OutOfRange));

        let replies =
            respond(&frame(&Message::data("1+1")), ChecksumPolicy::Verify, &calculator).unwrap();

        assert_eq!(kinds(&replies), [MessageKind::Ack, MessageKind::ErrorOutOfRange]);
    }
}
