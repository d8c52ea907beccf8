//! Length-prefixed framing for the swank socket.
//!
//! Every message travels as a six-digit lowercase hex byte count
//! followed by that many bytes of UTF-8 S-expression text.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::SwankError;

/// Width of the length header in bytes.
pub const HEADER_LEN: usize = 6;

/// Largest payload the six-digit header can describe.
pub const MAX_PAYLOAD: usize = 0xFF_FFFF;

/// Frame a payload for the wire.
pub fn encode(payload: &str) -> Result<Vec<u8>, SwankError> {
    let len = payload.len();
    if len > MAX_PAYLOAD {
        return Err(SwankError::FrameTooLarge { len });
    }
    let mut bytes = format!("{:06x}", len).into_bytes();
    bytes.extend_from_slice(payload.as_bytes());
    Ok(bytes)
}

/// Decode a length header.
pub fn decode_len(header: &[u8; HEADER_LEN]) -> Result<usize, SwankError> {
    let text = std::str::from_utf8(header)
        .map_err(|_| SwankError::BadLength(format!("{:?}", header)))?;
    usize::from_str_radix(text, 16).map_err(|_| SwankError::BadLength(text.to_string()))
}

/// Read one complete frame, returning its payload text.
///
/// An error here (including EOF mid-frame) means the stream can no
/// longer be trusted; callers tear the connection down.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, SwankError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let len = decode_len(&header)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    String::from_utf8(body).map_err(|_| SwankError::BadUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_hex_length() {
        let framed = encode("(:ok t)").unwrap();
        assert_eq!(&framed[..HEADER_LEN], b"000007");
        assert_eq!(&framed[HEADER_LEN..], b"(:ok t)");
    }

    #[test]
    fn encode_counts_bytes_not_chars() {
        // Two-byte UTF-8 character.
        let framed = encode("é").unwrap();
        assert_eq!(&framed[..HEADER_LEN], b"000002");
    }

    #[test]
    fn encode_rejects_oversize() {
        let big = "x".repeat(MAX_PAYLOAD + 1);
        assert!(matches!(
            encode(&big),
            Err(SwankError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn decode_len_parses_hex() {
        assert_eq!(decode_len(b"0000ff").unwrap(), 255);
        assert_eq!(decode_len(b"ffffff").unwrap(), MAX_PAYLOAD);
    }

    #[test]
    fn decode_len_rejects_garbage() {
        assert!(matches!(decode_len(b"00 0ff"), Err(SwankError::BadLength(_))));
        assert!(matches!(decode_len(b"zzzzzz"), Err(SwankError::BadLength(_))));
    }

    #[tokio::test]
    async fn read_frame_round_trip() {
        let framed = encode("(:return (:ok nil) 1)").unwrap();
        let mut cursor = std::io::Cursor::new(framed);
        let payload = read_frame(&mut cursor).await.unwrap();
        assert_eq!(payload, "(:return (:ok nil) 1)");
    }

    #[tokio::test]
    async fn read_frame_two_in_sequence() {
        let mut data = encode("(:a)").unwrap();
        data.extend_from_slice(&encode("(:b)").unwrap());
        let mut cursor = std::io::Cursor::new(data);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), "(:a)");
        assert_eq!(read_frame(&mut cursor).await.unwrap(), "(:b)");
    }

    #[tokio::test]
    async fn read_frame_truncated_body_errors() {
        let mut framed = encode("(:compiler-ready)").unwrap();
        framed.truncate(framed.len() - 3);
        let mut cursor = std::io::Cursor::new(framed);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(SwankError::Io(_))
        ));
    }
}
