//! Walks a frame's payload, turning offsets back into usable references.
//!
//! Not named `Iterator`: that identifier is already the standard prelude
//! trait, and naming this type the same would be actively misleading at
//! every call site. `Decoder` pairs naturally with [`crate::encoder::Encoder`].

use std::mem::MaybeUninit;

use crate::cache::PlanCache;
use crate::error::CodecError;
use crate::frame::{self, Frame};
use crate::key::Codable;
use crate::plan::{Plan, Strategy};

/// Reads frames out of an owned copy of the input bytes. The copy exists
/// because zero-copy decoding patches offset words into real addresses
/// *in place*, and Rust's aliasing rules don't allow mutating memory a
/// caller still holds a shared `&[u8]` into; owning a private copy here
/// keeps that mutation sound while still avoiding any further copying as
/// decoding walks deeper into the payload.
///
/// Every [`Decoder::decode_val`] call returns a `Box<T>` whose nested
/// `Ptr`/`Slice`/`Text` fields may point into this decoder's own buffer.
/// Those pointers are not lifetime-tracked by the type system — `Codable`
/// types carry no lifetime parameter, mirroring the garbage-collected
/// pointers of the original design — so a decoded value must not outlive
/// the `Decoder` it came from, and the buffer must not be reset while any
/// previously decoded value is still in use.
///
/// Under [`crate::config::Options::readonly_decode`], a decoded value's
/// pointer-bearing fields address copies held in this decoder's `owned`
/// list instead of the arena, so they additionally survive a `reset` of
/// the arena (see [`Decoder::reset`]) — but they are freed, along with
/// the rest of the list, once this `Decoder` itself is dropped, the same
/// "lives no longer than the decoder" rule zero-copy values already obey.
pub struct Decoder<'p> {
    plans: &'p PlanCache,
    arena: Vec<u8>,
    pos: usize,
    readonly: bool,
    strict: bool,
    /// Copied-out referents from readonly decoding, kept alive here so
    /// they are reclaimed on drop instead of leaking for the life of the
    /// process. Never touched by zero-copy decoding.
    owned: Vec<Box<[u8]>>,
    last_signature: Option<u32>,
    error: Option<CodecError>,
}

impl<'p> Decoder<'p> {
    pub(crate) fn new(plans: &'p PlanCache, buf: &[u8], readonly: bool, strict: bool) -> Self {
        Self {
            plans,
            arena: buf.to_vec(),
            pos: 0,
            readonly,
            strict,
            owned: Vec::new(),
            last_signature: None,
            error: None,
        }
    }

    /// Parses and decodes the next frame in this decoder's buffer.
    ///
    /// A frame signature that disagrees with `T`'s decoding plan is
    /// advisory by default: decoding proceeds and the producer's
    /// signature is available afterwards from [`Decoder::last_signature`].
    /// Set `Options::strict_signature` to reject a mismatch instead.
    pub fn decode_val<T: Codable>(&mut self) -> Result<Box<T>, CodecError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        match self.try_decode_val::<T>() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.error = Some(e);
                Err(e)
            }
        }
    }

    fn try_decode_val<T: Codable>(&mut self) -> Result<Box<T>, CodecError> {
        let plan = self.plans.decode_plan::<T>()?;

        let (signature, frame_len) = {
            let remaining = &self.arena[self.pos..];
            let frame: Frame<'_> = Frame::parse(remaining)?;
            (frame.signature, frame.frame_len())
        };
        self.last_signature = Some(signature);
        if self.strict && signature != plan.signature {
            return Err(CodecError::SignatureMismatch);
        }

        let payload_start = self.pos + frame::HEADER_LEN;
        let inline_size = plan.inline_size;

        let mut boxed: Box<MaybeUninit<T>> = Box::new(MaybeUninit::uninit());
        // SAFETY: `payload_start..payload_start+inline_size` was validated
        // by `Frame::parse` to lie within `self.arena`; `boxed` is sized
        // for `T`, whose inline form is exactly `inline_size` bytes.
        unsafe {
            let dst = boxed.as_mut_ptr() as *mut u8;
            let src = self.arena.as_ptr().add(payload_start);
            std::ptr::copy_nonoverlapping(src, dst, inline_size);
            decode_at(
                &plan,
                self.arena.as_mut_ptr(),
                payload_start,
                dst,
                self.readonly,
                &mut self.owned,
            );
        }

        self.pos += frame_len;

        // SAFETY: every byte of `boxed` has now been written: scalar bytes
        // by the bulk copy above, every pointer-bearing field by decode_at.
        Ok(unsafe { Box::from_raw(Box::into_raw(boxed) as *mut T) })
    }

    /// Resets this decoder onto a fresh buffer, clearing any latched
    /// error. Invalidates every zero-copy value previously decoded from
    /// this decoder, per the struct-level safety contract — readonly
    /// values survive, since they never pointed into the replaced arena.
    pub fn reset(&mut self, buf: &[u8]) {
        self.arena = buf.to_vec();
        self.pos = 0;
        self.error = None;
    }

    /// The first error encountered, if any.
    pub fn error(&self) -> Option<CodecError> {
        self.error
    }

    /// The signature carried by the most recently parsed frame, regardless
    /// of whether it matched the decoding plan's own signature. `None`
    /// until `decode_val` has parsed at least one frame.
    pub fn last_signature(&self) -> Option<u32> {
        self.last_signature
    }

    /// Takes ownership of this decoder's readonly-copied referents,
    /// leaving it with none. Used by [`crate::config::Config::unmarshal`]
    /// to keep only the memory a readonly-decoded value actually
    /// references alive once the rest of the decoder is dropped.
    pub(crate) fn take_owned(&mut self) -> Vec<Box<[u8]>> {
        std::mem::take(&mut self.owned)
    }

    /// Bytes remaining, unconsumed, in this decoder's buffer.
    pub fn remaining(&self) -> usize {
        self.arena.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.read_scalar().map(|b: [u8; 1]| b[0])
    }
    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        self.read_u8().map(|v| v as i8)
    }
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.read_scalar().map(u16::from_ne_bytes)
    }
    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        self.read_scalar().map(i16::from_ne_bytes)
    }
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.read_scalar().map(u32::from_ne_bytes)
    }
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.read_scalar().map(i32::from_ne_bytes)
    }
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        self.read_scalar().map(u64::from_ne_bytes)
    }
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        self.read_scalar().map(i64::from_ne_bytes)
    }
    pub fn read_usize(&mut self) -> Result<usize, CodecError> {
        self.read_scalar().map(usize::from_ne_bytes)
    }
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.read_scalar().map(f32::from_ne_bytes)
    }
    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        self.read_scalar().map(f64::from_ne_bytes)
    }

    fn read_scalar<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        if self.remaining() < N {
            return Err(CodecError::TruncatedFrame);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.arena[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

#[inline]
fn read_usize_at(dst: *const u8, offset: usize) -> usize {
    // SAFETY: caller guarantees `dst` addresses a valid inline header
    // of at least `offset + size_of::<usize>()` bytes.
    unsafe { (dst.add(offset) as *const usize).read_unaligned() }
}

#[inline]
fn write_usize_at(dst: *mut u8, offset: usize, value: usize) {
    // SAFETY: same contract as `read_usize_at`.
    unsafe { (dst.add(offset) as *mut usize).write_unaligned(value) }
}

/// Patches `plan`'s non-noop sub-fields already sitting at `dst` in place,
/// turning wire offsets (relative to `payload_base` within `arena_ptr`)
/// into usable addresses. In zero-copy mode those addresses alias
/// `arena_ptr` directly; in readonly mode each referent is copied into an
/// independently owned allocation pushed onto `owned` first, so it is
/// reclaimed when the owning `Decoder` drops rather than leaking forever.
///
/// # Safety
///
/// `dst` must be valid for `plan.inline_size` bytes holding `plan`'s raw
/// wire bytes; `arena_ptr` must be valid for reads covering every offset
/// this payload can reference.
unsafe fn decode_at(
    plan: &Plan,
    arena_ptr: *mut u8,
    payload_base: usize,
    dst: *mut u8,
    readonly: bool,
    owned: &mut Vec<Box<[u8]>>,
) {
    match &plan.strategy {
        Strategy::Scalar => {}
        Strategy::Text => {
            let off = read_usize_at(dst, 0);
            let len = read_usize_at(dst, 8);
            if off == 0 || len == 0 {
                write_usize_at(dst, 0, 0);
                write_usize_at(dst, 8, 0);
                return;
            }
            let src_ptr = arena_ptr.add(payload_base + off);
            let data_ptr = if readonly { own_copy(owned, src_ptr, len) } else { src_ptr };
            write_usize_at(dst, 0, data_ptr as usize);
            write_usize_at(dst, 8, len);
        }
        Strategy::Ptr { pointee } => {
            let off = read_usize_at(dst, 0);
            if off == 0 {
                write_usize_at(dst, 0, 0);
                return;
            }
            let src_ptr = arena_ptr.add(payload_base + off);
            let patch_dst =
                if readonly { own_copy(owned, src_ptr, pointee.inline_size) } else { src_ptr };
            decode_at(pointee, arena_ptr, payload_base, patch_dst, readonly, owned);
            write_usize_at(dst, 0, patch_dst as usize);
        }
        Strategy::Slice { elem_size, elem } => {
            let off = read_usize_at(dst, 0);
            let len = read_usize_at(dst, 8);
            if off == 0 || len == 0 {
                write_usize_at(dst, 0, 0);
                write_usize_at(dst, 8, 0);
                write_usize_at(dst, 16, 0);
                return;
            }
            let src_ptr = arena_ptr.add(payload_base + off);
            let total = len * elem_size;
            let patch_base = if readonly { own_copy(owned, src_ptr, total) } else { src_ptr };
            if let Some(eplan) = elem {
                for i in 0..len {
                    let edst = patch_base.add(i * elem_size);
                    decode_at(eplan, arena_ptr, payload_base, edst, readonly, owned);
                }
            }
            write_usize_at(dst, 0, patch_base as usize);
            write_usize_at(dst, 8, len);
            write_usize_at(dst, 16, len);
        }
        Strategy::Array { elem, elem_size, len } => {
            if let Some(eplan) = elem {
                for i in 0..*len {
                    let edst = dst.add(i * elem_size);
                    decode_at(eplan, arena_ptr, payload_base, edst, readonly, owned);
                }
            }
        }
        Strategy::Struct { fields } => {
            for (offset, fplan) in fields {
                let fdst = dst.add(*offset);
                decode_at(fplan, arena_ptr, payload_base, fdst, readonly, owned);
            }
        }
    }
}

/// Copies `len` bytes out of the decoder's arena into an independently
/// owned allocation, pushed onto `owned` so its lifetime is tied to the
/// decoder rather than leaked for the life of the process. A `Box<[u8]>`
/// moving within `owned`'s backing `Vec` does not move the heap bytes it
/// points to, so the returned pointer stays valid for as long as the
/// entry remains in `owned`.
unsafe fn own_copy(owned: &mut Vec<Box<[u8]>>, src: *const u8, len: usize) -> *mut u8 {
    let mut boxed: Box<[u8]> = vec![0u8; len].into_boxed_slice();
    std::ptr::copy_nonoverlapping(src, boxed.as_mut_ptr(), len);
    let ptr = boxed.as_mut_ptr();
    owned.push(boxed);
    ptr
}
