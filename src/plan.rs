//! Recursive construction of per-type encode/decode strategies.
//!
//! A [`Plan`] is the single value this codec builds once per type and
//! caches forever (see [`crate::cache::PlanCache`]): it knows how big the
//! type's inline wire form is, whether it needs any offset fixup at all,
//! and — if it does — exactly which sub-fields carry pointers and how to
//! walk them. This unifies what the Go source keeps as two separate
//! `ValEncoder`/`ValDecoder` interfaces into one value with two recursive
//! walks (`encode_at` in [`crate::encoder`], `decode_at` in
//! [`crate::decoder`]).

use std::sync::Arc;

use crate::error::CodecError;
use crate::key::{signature_of, Descriptor};

/// How a [`Plan`]'s type is laid out on the wire, and how to recurse into
/// whatever parts of it carry pointers.
pub enum Strategy {
    /// Fixed-size value, copied verbatim, never walked.
    Scalar,
    /// UTF-8 bytes behind a two-word inline header.
    Text,
    /// A single referent behind a one-word inline header.
    Ptr { pointee: Arc<Plan> },
    /// A sequence of `elem_size`-byte elements behind a three-word inline
    /// header. `elem` is `None` when the element itself needs no walking.
    Slice { elem_size: usize, elem: Option<Arc<Plan>> },
    /// `len` contiguous elements embedded directly inline (no header).
    /// `elem` is `None` when the element itself needs no walking.
    Array { len: usize, elem_size: usize, elem: Option<Arc<Plan>> },
    /// Fields in declaration order, restricted to those that need
    /// walking; no-op fields are left untouched by the bulk copy.
    Struct { fields: Vec<(usize, Arc<Plan>)> },
}

/// A cached, immutable encode/decode strategy for one type.
pub struct Plan {
    pub signature: u32,
    pub has_pointer: bool,
    pub is_noop: bool,
    /// Size in bytes of this type's own inline wire form.
    pub inline_size: usize,
    pub strategy: Strategy,
}

/// Recursively builds a [`Plan`] from a type's [`Descriptor`].
pub fn build(desc: &Descriptor) -> Result<Plan, CodecError> {
    let signature = signature_of(desc);
    match desc {
        Descriptor::Scalar(kind) => Ok(Plan {
            signature,
            has_pointer: false,
            is_noop: true,
            inline_size: kind.size(),
            strategy: Strategy::Scalar,
        }),
        Descriptor::Text => Ok(Plan {
            signature,
            has_pointer: true,
            is_noop: false,
            inline_size: 16,
            strategy: Strategy::Text,
        }),
        Descriptor::Ptr { pointee, .. } => {
            let pointee_plan = build(&pointee())?;
            Ok(Plan {
                signature,
                has_pointer: true,
                is_noop: false,
                inline_size: 8,
                strategy: Strategy::Ptr { pointee: Arc::new(pointee_plan) },
            })
        }
        Descriptor::Slice { elem_size, elem, .. } => {
            let elem_plan = build(&elem())?;
            let elem = if elem_plan.is_noop { None } else { Some(Arc::new(elem_plan)) };
            Ok(Plan {
                signature,
                has_pointer: true,
                is_noop: false,
                inline_size: 24,
                strategy: Strategy::Slice { elem_size: *elem_size, elem },
            })
        }
        Descriptor::Array { len, elem_size, elem, .. } => {
            let elem_plan = build(&elem())?;
            let is_noop = elem_plan.is_noop;
            let has_pointer = elem_plan.has_pointer;
            let elem = if is_noop { None } else { Some(Arc::new(elem_plan)) };
            Ok(Plan {
                signature,
                has_pointer,
                is_noop,
                inline_size: elem_size * len,
                strategy: Strategy::Array { len: *len, elem_size: *elem_size, elem },
            })
        }
        Descriptor::Struct { size, fields } => {
            let mut field_plans = Vec::new();
            let mut has_pointer = false;
            for field in *fields {
                let fplan = build(&(field.describe)())?;
                if fplan.has_pointer {
                    has_pointer = true;
                }
                if !fplan.is_noop {
                    field_plans.push((field.offset, Arc::new(fplan)));
                }
            }
            Ok(Plan {
                signature,
                has_pointer,
                is_noop: !has_pointer,
                inline_size: *size,
                strategy: Strategy::Struct { fields: field_plans },
            })
        }
    }
}
