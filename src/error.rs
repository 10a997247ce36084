//! Error types for this codec.

use thiserror::Error;

/// Errors produced while building a plan, encoding, or decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// `plan::build` was asked to describe a type it cannot realise.
    #[error("unsupported type")]
    UnsupportedType,
    /// Trailing CRC32 does not match the payload.
    #[error("crc32 mismatch")]
    CrcMismatch,
    /// Buffer is shorter than the frame's declared size.
    #[error("truncated frame")]
    TruncatedFrame,
    /// Frame's signature does not match the decoding plan's signature.
    #[error("signature mismatch")]
    SignatureMismatch,
}
