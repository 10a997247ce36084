//! Wire-shaped stand-ins for `Box<T>`, `Vec<T>` and `String`.
//!
//! Rust gives none of these types a guaranteed layout, so none of them can
//! be the destination of a raw "bulk-copy the struct bytes, then patch the
//! pointer-bearing field slots" decode. These three container types exist
//! solely to have a layout this codec can promise: [`Ptr<T>`] is one 8-byte
//! word, [`Text`] is two, [`Slice<T>`] is three — matching the inline
//! header widths the wire format prescribes.
//!
//! In zero-copy mode a container's pointer addresses memory inside the
//! [`crate::decoder::Decoder`]'s input buffer. In readonly mode it instead
//! addresses a freshly allocated region the decoder owns independently.
//! Either way, from the caller's point of view these behave like `&T`,
//! `&[T]` and `&str` — dereferencing and comparing structurally, never
//! exposing raw addresses.

use core::any::TypeId;
use core::fmt;
use core::ops::Deref;
use core::ptr::NonNull;

use crate::key::{Codable, Descriptor};

/// A single owned referent. Null is represented as an absent pointer, the
/// same as Go's nil.
#[repr(C)]
pub struct Ptr<T> {
    ptr: Option<NonNull<T>>,
}

impl<T> Ptr<T> {
    /// The null pointer: decodes from (and encodes to) offset `0`.
    pub const fn null() -> Self {
        Self { ptr: None }
    }

    /// Wrap a raw, already-initialised pointer. Used by the decoder after
    /// computing an absolute address from a wire offset.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `T` and must outlive every access
    /// made through this `Ptr`.
    pub unsafe fn from_raw(ptr: *const T) -> Self {
        Self { ptr: NonNull::new(ptr as *mut T) }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn as_ptr(&self) -> Option<*const T> {
        self.ptr.map(|p| p.as_ptr() as *const T)
    }

    pub fn get(&self) -> Option<&T> {
        // SAFETY: from_raw's caller contract guarantees validity for the
        // lifetime this Ptr is used within.
        self.ptr.map(|p| unsafe { p.as_ref() })
    }
}

/// # Safety
///
/// `Ptr<T>`'s layout is exactly one pointer-sized word, matching the
/// `Descriptor::Ptr` inline header it describes.
unsafe impl<T: Codable> Codable for Ptr<T> {
    fn describe() -> Descriptor {
        Descriptor::Ptr { type_id: TypeId::of::<Ptr<T>>(), pointee: T::describe }
    }
}

impl<T> Default for Ptr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self { ptr: self.ptr }
    }
}
impl<T> Copy for Ptr<T> {}

impl<T: PartialEq> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
impl<T: Eq> Eq for Ptr<T> {}

impl<T: fmt::Debug> fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("Ptr").field(v).finish(),
            None => f.write_str("Ptr(null)"),
        }
    }
}

/// A growable sequence referent. Capacity is always coerced to equal
/// length on decode (spec capacity-clamp invariant).
#[repr(C)]
pub struct Slice<T> {
    ptr: Option<NonNull<T>>,
    len: usize,
    cap: usize,
}

impl<T> Slice<T> {
    pub const fn empty() -> Self {
        Self { ptr: None, len: 0, cap: 0 }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` contiguous `T`s and must
    /// outlive every access made through this `Slice`.
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize) -> Self {
        Self { ptr: NonNull::new(ptr as *mut T), len, cap: len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[T] {
        match self.ptr {
            Some(p) if self.len > 0 => {
                // SAFETY: from_raw_parts's caller contract guarantees this.
                unsafe { core::slice::from_raw_parts(p.as_ptr(), self.len) }
            }
            _ => &[],
        }
    }
}

/// # Safety
///
/// `Slice<T>`'s layout is exactly three pointer-sized words, matching the
/// `Descriptor::Slice` inline header it describes.
unsafe impl<T: Codable> Codable for Slice<T> {
    fn describe() -> Descriptor {
        Descriptor::Slice {
            type_id: TypeId::of::<Slice<T>>(),
            elem_size: core::mem::size_of::<T>(),
            elem: T::describe,
        }
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for Slice<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: PartialEq> PartialEq for Slice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
impl<T: Eq> Eq for Slice<T> {}

impl<T: fmt::Debug> fmt::Debug for Slice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// UTF-8 text referent.
#[repr(C)]
pub struct Text {
    ptr: Option<NonNull<u8>>,
    len: usize,
}

impl Text {
    pub const fn empty() -> Self {
        Self { ptr: None, len: 0 }
    }

    /// # Safety
    ///
    /// `ptr` must reference `len` valid UTF-8 bytes and must outlive every
    /// access made through this `Text`.
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize) -> Self {
        Self { ptr: NonNull::new(ptr as *mut u8), len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_str(&self) -> &str {
        match self.ptr {
            Some(p) if self.len > 0 => {
                // SAFETY: from_raw_parts's caller contract guarantees this,
                // and the encoder only ever writes bytes taken from a &str.
                let bytes = unsafe { core::slice::from_raw_parts(p.as_ptr(), self.len) };
                unsafe { core::str::from_utf8_unchecked(bytes) }
            }
            _ => "",
        }
    }
}

/// # Safety
///
/// `Text`'s layout is exactly two pointer-sized words, matching the
/// `Descriptor::Text` inline header it describes.
unsafe impl Codable for Text {
    fn describe() -> Descriptor {
        Descriptor::Text
    }
}

impl Default for Text {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Text {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl Eq for Text {}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
