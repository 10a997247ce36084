//! Linearises values into a contiguous, self-framed byte buffer.

use crate::cache::PlanCache;
use crate::error::CodecError;
use crate::frame;
use crate::key::Codable;
use crate::plan::{Plan, Strategy};

/// Appends one frame per [`Encoder::encode_val`] call to an internal
/// buffer. Not `Sync`: one encoder is meant to be driven by a single
/// caller at a time, the same contract the original stream type carries.
pub struct Encoder<'p> {
    plans: &'p PlanCache,
    buf: Vec<u8>,
    error: Option<CodecError>,
}

impl<'p> Encoder<'p> {
    /// Builds an encoder, optionally adopting `initial` as its starting
    /// buffer so a caller can reuse an allocation across encoders instead
    /// of growing a fresh one from empty.
    pub(crate) fn new(plans: &'p PlanCache, initial: Option<Vec<u8>>) -> Self {
        Self { plans, buf: initial.unwrap_or_default(), error: None }
    }

    /// Encodes `v` as one complete frame, appended to this encoder's
    /// buffer. Once any call has failed, every later call is a no-op that
    /// returns the same latched error.
    pub fn encode_val<T: Codable>(&mut self, v: &T) -> Result<(), CodecError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        match self.try_encode_val(v) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.error = Some(e);
                Err(e)
            }
        }
    }

    fn try_encode_val<T: Codable>(&mut self, v: &T) -> Result<(), CodecError> {
        let plan = self.plans.encode_plan::<T>()?;

        let mut payload = Vec::with_capacity(plan.inline_size);
        let src = v as *const T as *const u8;
        // SAFETY: `src` is valid for `inline_size` bytes for the duration
        // of this call, and `plan` was built from `T`'s own descriptor.
        unsafe {
            payload.extend_from_slice(std::slice::from_raw_parts(src, plan.inline_size));
            encode_at(&plan, &mut payload, 0, 0, src);
        }

        frame::write_frame(&mut self.buf, plan.signature, &payload);
        Ok(())
    }

    /// Replaces this encoder's underlying buffer with `buf`, clearing it
    /// first so the buffer's already-allocated capacity is preserved and
    /// reused for whatever is encoded next, and clears any latched error.
    pub fn reset(&mut self, mut buf: Vec<u8>) {
        buf.clear();
        self.buf = buf;
        self.error = None;
    }

    /// The bytes written so far, spanning every frame encoded.
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the encoder, returning its accumulated buffer.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buf
    }

    /// The first error encountered, if any.
    pub fn error(&self) -> Option<CodecError> {
        self.error
    }
}

#[inline]
fn read_usize_raw(src: *const u8) -> usize {
    // SAFETY: caller guarantees `src` addresses a valid, initialised
    // pointer-sized word (the bulk-copied bit pattern of a Ptr/Slice/Text
    // header field).
    unsafe { (src as *const usize).read_unaligned() }
}

#[inline]
fn write_usize_at(buf: &mut [u8], pos: usize, value: usize) {
    buf[pos..pos + std::mem::size_of::<usize>()].copy_from_slice(&value.to_ne_bytes());
}

/// Walks `plan`'s non-noop sub-fields, appending referents to `buf` and
/// patching the inline offset/length words already sitting at
/// `buf[inline_pos..]` (placed there by an earlier bulk byte copy).
///
/// # Safety
///
/// `src` must be valid for reads of `plan.inline_size` bytes, matching the
/// real in-memory layout `plan` was built to describe.
pub(crate) unsafe fn encode_at(
    plan: &Plan,
    buf: &mut Vec<u8>,
    payload_base: usize,
    inline_pos: usize,
    src: *const u8,
) {
    match &plan.strategy {
        Strategy::Scalar => {}
        Strategy::Text => {
            let data_ptr = read_usize_raw(src);
            let len = read_usize_raw(src.add(8));
            if data_ptr == 0 || len == 0 {
                write_usize_at(buf, inline_pos, 0);
                write_usize_at(buf, inline_pos + 8, 0);
            } else {
                let referent_pos = buf.len();
                buf.extend_from_slice(std::slice::from_raw_parts(data_ptr as *const u8, len));
                write_usize_at(buf, inline_pos, referent_pos - payload_base);
                write_usize_at(buf, inline_pos + 8, len);
            }
        }
        Strategy::Ptr { pointee } => {
            let data_ptr = read_usize_raw(src);
            if data_ptr == 0 {
                write_usize_at(buf, inline_pos, 0);
            } else {
                let referent_pos = buf.len();
                buf.extend_from_slice(std::slice::from_raw_parts(
                    data_ptr as *const u8,
                    pointee.inline_size,
                ));
                encode_at(pointee, buf, payload_base, referent_pos, data_ptr as *const u8);
                write_usize_at(buf, inline_pos, referent_pos - payload_base);
            }
        }
        Strategy::Slice { elem_size, elem } => {
            let data_ptr = read_usize_raw(src);
            let len = read_usize_raw(src.add(8));
            if data_ptr == 0 || len == 0 {
                write_usize_at(buf, inline_pos, 0);
                write_usize_at(buf, inline_pos + 8, 0);
                write_usize_at(buf, inline_pos + 16, 0);
            } else {
                let referent_pos = buf.len();
                buf.extend_from_slice(std::slice::from_raw_parts(
                    data_ptr as *const u8,
                    len * elem_size,
                ));
                if let Some(eplan) = elem {
                    for i in 0..len {
                        let esrc = (data_ptr as *const u8).add(i * elem_size);
                        let epos = referent_pos + i * elem_size;
                        encode_at(eplan, buf, payload_base, epos, esrc);
                    }
                }
                write_usize_at(buf, inline_pos, referent_pos - payload_base);
                write_usize_at(buf, inline_pos + 8, len);
                write_usize_at(buf, inline_pos + 16, len);
            }
        }
        Strategy::Array { elem, elem_size, len } => {
            if let Some(eplan) = elem {
                for i in 0..*len {
                    let esrc = src.add(i * elem_size);
                    let epos = inline_pos + i * elem_size;
                    encode_at(eplan, buf, payload_base, epos, esrc);
                }
            }
        }
        Strategy::Struct { fields } => {
            for (offset, fplan) in fields {
                let fsrc = src.add(*offset);
                let fpos = inline_pos + offset;
                encode_at(fplan, buf, payload_base, fpos, fsrc);
            }
        }
    }
}
