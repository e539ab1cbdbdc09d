//! CRC-32 over message payloads.
//!
//! The checksum is the IEEE 802.3 CRC-32 (the same value `zlib.crc32`
//! produces), computed over the raw payload bytes only: no header, no padding.

/// Computes the CRC-32 of `payload`.
///
/// # Examples
///
/// ```rust
/// use calc_core::protocol::checksum::crc32;
///
/// assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
/// assert_eq!(crc32(b""), 0);
/// ```
pub fn crc32(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Returns `true` when `expected` is the CRC-32 of `payload`.
pub fn verify(payload: &[u8], expected: u32) -> bool {
    crc32(payload) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_of_empty_payload_is_zero() {
        assert_eq!(crc32(&[]), 0x0000_0000);
    }

    #[test]
    fn test_crc32_check_value() {
        // The standard CRC-32 check input.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_verify_detects_single_bit_flip() {
        let payload = b"3+4";
        let sum = crc32(payload);
        assert!(verify(payload, sum));
        assert!(!verify(payload, sum ^ 1));
    }
}
