//! Frozen codec options and the two process-wide singletons built on them.

use std::sync::OnceLock;

use crate::cache::PlanCache;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::key::Codable;

/// Options that shape decoding. Encoding has no configurable behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// When set, every pointer-bearing referent is copied out of the
    /// input buffer before being pointed at, so the decoded value's
    /// lifetime is independent of the buffer it was decoded from.
    pub readonly_decode: bool,
    /// When set, a frame whose signature disagrees with the decoding
    /// plan's own signature is rejected with `CodecError::SignatureMismatch`.
    /// Off by default: a mismatch is advisory, decoding proceeds, and the
    /// producer's signature is available from `Decoder::last_signature`
    /// for a caller that wants to check it itself.
    pub strict_signature: bool,
}

/// A configured codec: one [`PlanCache`] plus a fixed set of [`Options`].
pub struct Config {
    options: Options,
    plans: PlanCache,
}

impl Config {
    pub fn new(options: Options) -> Self {
        Self { options, plans: PlanCache::new() }
    }

    /// Builds an encoder, optionally adopting `initial` as its starting
    /// buffer (spec.md §6's `Config.NewStream(optional_initial_buffer)`).
    pub fn encoder(&self, initial: Option<Vec<u8>>) -> Encoder<'_> {
        Encoder::new(&self.plans, initial)
    }

    pub fn decoder<'d>(&'d self, buf: &[u8]) -> Decoder<'d> {
        Decoder::new(&self.plans, buf, self.options.readonly_decode, self.options.strict_signature)
    }

    pub fn marshal<T: Codable>(&self, v: &T) -> Result<Vec<u8>, crate::error::CodecError> {
        let mut enc = self.encoder(None);
        enc.encode_val(v)?;
        Ok(enc.into_buffer())
    }

    /// Decodes a single frame as a one-shot convenience. Unlike
    /// [`Config::decoder`], there is no long-lived [`Decoder`] left for the
    /// caller to keep alive.
    ///
    /// In zero-copy mode, if `T` carries any pointer-bearing fields the
    /// whole decoder (and with it, the arena its `Ptr`/`Slice`/`Text`
    /// fields address) is intentionally never freed — a one-time leak
    /// traded for soundness, the same trade-off `Config::decoder` lets a
    /// caller avoid by keeping the `Decoder` alive instead. In readonly
    /// mode the arena itself is never referenced by the decoded value, so
    /// only the smaller set of copied-out referents is leaked, and the
    /// rest of the decoder (its arena) is freed normally.
    pub fn unmarshal<T: Codable>(
        &self,
        bytes: &[u8],
    ) -> Result<Box<T>, crate::error::CodecError> {
        let mut dec = self.decoder(bytes);
        let v = dec.decode_val::<T>()?;
        if self.plans.decode_plan::<T>()?.has_pointer {
            if self.options.readonly_decode {
                std::mem::forget(dec.take_owned());
            } else {
                std::mem::forget(dec);
            }
        }
        Ok(v)
    }
}

fn default_config() -> &'static Config {
    static DEFAULT: OnceLock<Config> = OnceLock::new();
    DEFAULT.get_or_init(|| Config::new(Options { readonly_decode: false, ..Options::default() }))
}

fn readonly_config() -> &'static Config {
    static READONLY: OnceLock<Config> = OnceLock::new();
    READONLY.get_or_init(|| Config::new(Options { readonly_decode: true, ..Options::default() }))
}

/// The default, zero-copy codec configuration.
pub static DEFAULT_CONFIG: fn() -> &'static Config = default_config;

/// The codec configuration that copies pointer-bearing referents out of
/// the input buffer on decode.
pub static READONLY_CONFIG: fn() -> &'static Config = readonly_config;
