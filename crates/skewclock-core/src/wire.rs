//! Wire format for clock values.
//!
//! One connection carries one value: the sender's post-increment logical
//! clock as ASCII decimal. The sender closes its write half after the digits.
//! The receiver stops at end-of-input or at the first `\n`, and tolerates
//! surrounding ASCII whitespace (so `"42"`, `"42\n"` and `" 42\r\n"` all
//! decode to 42).

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest payload accepted, delimiter and padding included.
///
/// `u64::MAX` has 20 digits; the rest is slack for whitespace.
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Reasons an inbound payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Nothing but whitespace was received.
    #[error("empty payload")]
    Empty,

    /// Payload exceeded [`MAX_PAYLOAD_LEN`].
    #[error("payload too long: {len} bytes")]
    TooLong {
        /// Bytes received before giving up.
        len: usize,
    },

    /// Payload is not valid UTF-8.
    #[error("payload is not UTF-8")]
    NotUtf8,

    /// Payload is not a non-negative decimal integer that fits in `u64`.
    #[error("invalid clock value: {0:?}")]
    InvalidValue(String),
}

/// Encode a clock value for the wire.
pub fn encode_clock(value: u64) -> Bytes {
    Bytes::from(value.to_string())
}

/// Decode one payload into a clock value.
pub fn decode_clock(payload: &[u8]) -> Result<u64, WireError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(WireError::TooLong { len: payload.len() });
    }

    let text = std::str::from_utf8(payload).map_err(|_| WireError::NotUtf8)?;
    let text = text.trim_ascii();
    if text.is_empty() {
        return Err(WireError::Empty);
    }

    // `u64::from_str` accepts a leading '+', the wire format does not
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::InvalidValue(text.to_string()));
    }

    text.parse::<u64>().map_err(|_| WireError::InvalidValue(text.to_string()))
}

/// Read one payload from `reader`.
///
/// Stops at end-of-input, at the first `\n` (which is dropped), or once more
/// than [`MAX_PAYLOAD_LEN`] bytes have arrived. An oversized result is left
/// for [`decode_clock`] to reject.
pub async fn read_payload<R>(reader: &mut R) -> std::io::Result<BytesMut>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(MAX_PAYLOAD_LEN + 1);

    loop {
        if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            buf.truncate(pos);
            break;
        }
        if buf.len() > MAX_PAYLOAD_LEN {
            break;
        }
        if reader.read_buf(&mut buf).await? == 0 {
            break;
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_and_delimited() {
        assert_eq!(decode_clock(b"42"), Ok(42));
        assert_eq!(decode_clock(b"42\n"), Ok(42));
        assert_eq!(decode_clock(b" 7\r\n"), Ok(7));
        assert_eq!(decode_clock(b"0"), Ok(0));
        assert_eq!(decode_clock(b"18446744073709551615"), Ok(u64::MAX));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_clock(b""), Err(WireError::Empty));
        assert_eq!(decode_clock(b"  \n"), Err(WireError::Empty));
        assert_eq!(decode_clock(b"INVALID"), Err(WireError::InvalidValue("INVALID".into())));
        assert_eq!(decode_clock(b"-3"), Err(WireError::InvalidValue("-3".into())));
        assert_eq!(decode_clock(b"+3"), Err(WireError::InvalidValue("+3".into())));
        assert_eq!(decode_clock(b"1 2"), Err(WireError::InvalidValue("1 2".into())));
        assert_eq!(decode_clock(&[0xff, 0xfe]), Err(WireError::NotUtf8));
    }

    #[test]
    fn decode_rejects_overflow_and_oversize() {
        assert!(matches!(decode_clock(b"18446744073709551616"), Err(WireError::InvalidValue(_))));
        let long = [b'1'; MAX_PAYLOAD_LEN + 1];
        assert_eq!(decode_clock(&long), Err(WireError::TooLong { len: MAX_PAYLOAD_LEN + 1 }));
    }

    #[test]
    fn encode_is_bare_decimal() {
        assert_eq!(&encode_clock(1234)[..], b"1234");
        assert_eq!(decode_clock(&encode_clock(u64::MAX)), Ok(u64::MAX));
    }

    #[tokio::test]
    async fn read_payload_until_eof() {
        let mut input: &[u8] = b"123";
        let buf = read_payload(&mut input).await.unwrap();
        assert_eq!(&buf[..], b"123");
    }

    #[tokio::test]
    async fn read_payload_stops_at_newline() {
        let mut input: &[u8] = b"77\n99";
        let buf = read_payload(&mut input).await.unwrap();
        assert_eq!(&buf[..], b"77");
    }

    #[tokio::test]
    async fn read_payload_bounds_endless_input() {
        let endless = tokio::io::repeat(b'9');
        let mut limited = endless.take(10_000);
        let buf = read_payload(&mut limited).await.unwrap();
        assert!(buf.len() > MAX_PAYLOAD_LEN);
        assert!(buf.len() < 10_000);
        assert!(matches!(decode_clock(&buf), Err(WireError::TooLong { .. })));
    }
}
