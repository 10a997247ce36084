//! Static structural description of encodable types.
//!
//! Go's original implementation walks `reflect.Type` at runtime to decide
//! how a value is laid out. Rust has no such facility, so every encodable
//! type instead implements [`Codable`], which hands back a fixed
//! [`Descriptor`] describing its shape once, up front.

use core::any::TypeId;

/// Scalar leaf kinds. Each is a no-op on the wire: its bytes are copied
/// verbatim, with no offset fixup required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    Usize,
    I8,
    I16,
    I32,
    I64,
    Isize,
    F32,
    F64,
}

impl ScalarKind {
    /// Size in bytes of this scalar's inline form.
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::Bool | ScalarKind::U8 | ScalarKind::I8 => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64
            | ScalarKind::I64
            | ScalarKind::F64
            | ScalarKind::Usize
            | ScalarKind::Isize => 8,
        }
    }

    /// A stable tag used when folding a scalar into a structural signature.
    const fn sig_tag(self) -> u32 {
        match self {
            ScalarKind::Bool => 1,
            ScalarKind::U8 => 2,
            ScalarKind::U16 => 3,
            ScalarKind::U32 => 4,
            ScalarKind::U64 => 5,
            ScalarKind::Usize => 6,
            ScalarKind::I8 => 7,
            ScalarKind::I16 => 8,
            ScalarKind::I32 => 9,
            ScalarKind::I64 => 10,
            ScalarKind::Isize => 11,
            ScalarKind::F32 => 12,
            ScalarKind::F64 => 13,
        }
    }
}

/// One field of a [`Descriptor::Struct`], with its byte offset inside the
/// enclosing struct's inline form.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub type_id: TypeId,
    pub describe: fn() -> Descriptor,
}

/// A static structural description of one type, mirroring the kinds
/// `gocodec`'s dispatch switch recognises via `reflect.Kind`.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Scalar(ScalarKind),
    /// UTF-8 text, backed by [`crate::containers::Text`].
    Text,
    /// A single owned referent, backed by [`crate::containers::Ptr`].
    Ptr {
        type_id: TypeId,
        pointee: fn() -> Descriptor,
    },
    /// A growable sequence, backed by [`crate::containers::Slice`].
    Slice {
        type_id: TypeId,
        elem_size: usize,
        elem: fn() -> Descriptor,
    },
    /// A fixed-length array of `len` elements, each `elem_size` bytes.
    Array {
        type_id: TypeId,
        len: usize,
        elem_size: usize,
        elem: fn() -> Descriptor,
    },
    /// A `#[repr(C)]` struct, fields in declaration order.
    Struct {
        size: usize,
        fields: &'static [FieldDescriptor],
    },
}

/// Implemented by every type this codec can encode and decode.
///
/// # Safety
///
/// The implementor asserts that [`Self::describe`] exactly matches the
/// type's real memory layout: field offsets, element size, and total size
/// must agree with what the compiler actually lays out. A mismatched
/// `Descriptor` lets [`crate::plan::build`] issue out-of-bounds reads and
/// writes during encode/decode. `codable_struct!` derives this correctly
/// from `core::mem::offset_of!`; hand-written impls must take the same
/// care.
pub unsafe trait Codable: 'static {
    fn describe() -> Descriptor
    where
        Self: Sized;
}

macro_rules! impl_codable_scalar {
    ($t:ty, $kind:expr) => {
        unsafe impl Codable for $t {
            fn describe() -> Descriptor {
                Descriptor::Scalar($kind)
            }
        }
    };
}

impl_codable_scalar!(bool, ScalarKind::Bool);
impl_codable_scalar!(u8, ScalarKind::U8);
impl_codable_scalar!(u16, ScalarKind::U16);
impl_codable_scalar!(u32, ScalarKind::U32);
impl_codable_scalar!(u64, ScalarKind::U64);
impl_codable_scalar!(usize, ScalarKind::Usize);
impl_codable_scalar!(i8, ScalarKind::I8);
impl_codable_scalar!(i16, ScalarKind::I16);
impl_codable_scalar!(i32, ScalarKind::I32);
impl_codable_scalar!(i64, ScalarKind::I64);
impl_codable_scalar!(isize, ScalarKind::Isize);
impl_codable_scalar!(f32, ScalarKind::F32);
impl_codable_scalar!(f64, ScalarKind::F64);

unsafe impl<T: Codable, const N: usize> Codable for [T; N] {
    fn describe() -> Descriptor {
        Descriptor::Array {
            type_id: TypeId::of::<[T; N]>(),
            len: N,
            elem_size: core::mem::size_of::<T>(),
            elem: T::describe,
        }
    }
}

/// Fold a child's signature into its parent's, matching the
/// `31 * signature(parent_kind) + signature(child)` accumulation.
pub fn fold_signature(acc: u32, child: u32) -> u32 {
    acc.wrapping_mul(31).wrapping_add(child)
}

/// Compute the structural signature of a [`Descriptor`], recursing through
/// composite kinds. Collisions are tolerated: this is an advisory
/// producer/consumer sanity check, not a correctness boundary.
pub fn signature_of(desc: &Descriptor) -> u32 {
    match desc {
        Descriptor::Scalar(k) => fold_signature(100, k.sig_tag()),
        Descriptor::Text => 200,
        Descriptor::Ptr { pointee, .. } => fold_signature(300, signature_of(&pointee())),
        Descriptor::Slice { elem, .. } => fold_signature(400, signature_of(&elem())),
        Descriptor::Array { len, elem, .. } => {
            fold_signature(fold_signature(500, *len as u32), signature_of(&elem()))
        }
        Descriptor::Struct { fields, .. } => {
            let mut sig = 600u32;
            for field in *fields {
                sig = fold_signature(sig, signature_of(&(field.describe)()));
            }
            sig
        }
    }
}

/// Declares a [`Codable`] impl for a `#[repr(C)]` struct by listing its
/// fields and their declared types.
///
/// ```ignore
/// #[repr(C)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
/// codable_struct!(Point { x: i64, y: i64 });
/// ```
#[macro_export]
macro_rules! codable_struct {
    ($ty:ty { $($field:ident : $fty:ty),* $(,)? }) => {
        unsafe impl $crate::key::Codable for $ty {
            fn describe() -> $crate::key::Descriptor {
                static FIELDS: &[$crate::key::FieldDescriptor] = &[
                    $(
                        $crate::key::FieldDescriptor {
                            name: stringify!($field),
                            offset: core::mem::offset_of!($ty, $field),
                            type_id: core::any::TypeId::of::<$fty>(),
                            describe: <$fty as $crate::key::Codable>::describe,
                        },
                    )*
                ];
                $crate::key::Descriptor::Struct {
                    size: core::mem::size_of::<$ty>(),
                    fields: FIELDS,
                }
            }
        }
    };
}
