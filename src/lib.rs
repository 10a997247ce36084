//! A zero-copy binary codec for in-memory structured data.
//!
//! Encoding linearises a value into a contiguous buffer, writing
//! pointer-bearing fields as byte offsets into an appended region of
//! referents. Decoding walks that same payload back, turning offsets into
//! real references — by default aliasing the decoder's own buffer with no
//! further copying, or, under [`Options::readonly_decode`], by copying
//! every referent out into independently owned memory first.
//!
//! Targets little-endian, unaligned-access-tolerant hosts (the frame
//! header is explicitly little-endian; the payload body mirrors the
//! producing host's native word order and alignment, and is not portable
//! across architectures — see the crate's design notes).

pub mod cache;
pub mod config;
pub mod containers;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod key;
pub mod plan;

pub use config::{Config, Options, DEFAULT_CONFIG, READONLY_CONFIG};
pub use containers::{Ptr, Slice, Text};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::CodecError;
pub use frame::Frame;
pub use key::{Codable, Descriptor, FieldDescriptor, ScalarKind};

/// Encodes `v` as a single frame using the default, zero-copy
/// configuration.
pub fn marshal<T: Codable>(v: &T) -> Result<Vec<u8>, CodecError> {
    let result = DEFAULT_CONFIG().marshal(v);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "marshal failed");
    }
    result
}

/// Decodes a single frame from `bytes` using the default, zero-copy
/// configuration. The returned value may borrow `bytes`' contents through
/// an internally owned copy; see [`Decoder`] for the lifetime contract.
pub fn unmarshal<T: Codable>(bytes: &[u8]) -> Result<Box<T>, CodecError> {
    let result = DEFAULT_CONFIG().unmarshal(bytes);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "unmarshal failed");
    }
    result
}
