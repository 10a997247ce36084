//! Frame envelope: `size | signature | payload | crc32`.
//!
//! `size` and `signature` are fixed at little-endian so any reader can
//! parse the header regardless of host endianness; the payload body is
//! left exactly as the producing host wrote it (native word order), the
//! same non-portability trade-off the in-memory wire form already makes.

use crate::error::CodecError;

pub const HEADER_LEN: usize = 8;
pub const TRAILER_LEN: usize = 4;

/// A parsed, CRC-verified frame borrowed from an input buffer.
pub struct Frame<'a> {
    pub size: u32,
    pub signature: u32,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parses and CRC-verifies one frame from the start of `bytes`.
    ///
    /// `bytes` may contain more than one frame; only the first `size`
    /// bytes are consumed, matching the streaming scenario where frames
    /// are concatenated back to back.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN + TRAILER_LEN {
            return Err(CodecError::TruncatedFrame);
        }
        let size = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let signature = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let size = size as usize;
        if size < HEADER_LEN + TRAILER_LEN || bytes.len() < size {
            return Err(CodecError::TruncatedFrame);
        }

        let payload = &bytes[HEADER_LEN..size - TRAILER_LEN];
        let crc_bytes = &bytes[size - TRAILER_LEN..size];
        let expected = u32::from_le_bytes(crc_bytes.try_into().unwrap());
        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Err(CodecError::CrcMismatch);
        }

        Ok(Frame { size: size as u32, signature, payload })
    }

    /// Total length in bytes of the frame this was parsed from.
    pub fn frame_len(&self) -> usize {
        self.size as usize
    }
}

/// Writes a complete frame (`size | signature | payload | crc32`) for
/// `payload` into `out`, appending.
pub fn write_frame(out: &mut Vec<u8>, signature: u32, payload: &[u8]) {
    let size = (HEADER_LEN + payload.len() + TRAILER_LEN) as u32;
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&signature.to_le_bytes());
    out.extend_from_slice(payload);
    let crc = crc32fast::hash(payload);
    out.extend_from_slice(&crc.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 0xDEAD_BEEF, b"hello");
        let frame = Frame::parse(&buf).unwrap();
        assert_eq!(frame.signature, 0xDEAD_BEEF);
        assert_eq!(frame.payload, b"hello");
        assert_eq!(frame.frame_len(), buf.len());
    }

    #[test]
    fn rejects_corrupted_payload() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 1, b"hello");
        let last = buf.len() - 5;
        buf[last] ^= 0xFF;
        assert_eq!(Frame::parse(&buf), Err(CodecError::CrcMismatch));
    }

    #[test]
    fn rejects_truncated_buffer() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 1, b"hello world");
        buf.truncate(buf.len() - 2);
        assert_eq!(Frame::parse(&buf), Err(CodecError::TruncatedFrame));
    }

    #[test]
    fn parses_first_of_several_concatenated_frames() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 1, b"first");
        write_frame(&mut buf, 2, b"second-frame-body");
        let first = Frame::parse(&buf).unwrap();
        assert_eq!(first.payload, b"first");
        let rest = &buf[first.frame_len()..];
        let second = Frame::parse(rest).unwrap();
        assert_eq!(second.payload, b"second-frame-body");
    }
}
