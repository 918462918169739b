//! Polymorphic values and structural equality over them.
//!
//! An [`AnyValue`] pairs a descriptor reference with a data word. A value
//! whose size is at most one word is stored inline in the word itself;
//! anything larger leaves its storage where it is and the word holds its
//! address. The pair never owns that storage, so an `AnyValue` must not
//! outlive the value it was composed from.
//!
//! [`any_equal`] implements dynamic equality for values of statically
//! unknown type. Callers are responsible for checking comparability first:
//! a slice, map, or function value reaching the comparison is an
//! internal-consistency violation and aborts.

use crate::kind::Kind;
use crate::store::{DescriptorStore, TypeRef};
use crate::ty::Type;

/// A value of statically unknown type: a descriptor reference plus one data
/// word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyValue {
    /// The value's type, or [`TypeRef::NULL`] for the empty value.
    pub ty: TypeRef,
    /// The inline scalar or the address of the value's storage.
    pub word: usize,
}

impl AnyValue {
    /// The empty polymorphic value.
    pub const fn null() -> AnyValue {
        AnyValue {
            ty: TypeRef::NULL,
            word: 0,
        }
    }

    /// Compose a polymorphic value from its parts.
    pub fn new(ty: TypeRef, word: usize) -> AnyValue {
        AnyValue { ty, word }
    }

    /// Whether this is the empty value.
    pub fn is_null(&self) -> bool {
        self.ty.is_null()
    }

    /// The address of the value's bytes: the word itself for out-of-line
    /// values, the word's own storage for inline ones.
    fn data_ptr(&self, ty: &Type<'_>) -> *const u8 {
        if ty.size() <= ty.store().word_size() {
            &self.word as *const usize as *const u8
        } else {
            self.word as *const u8
        }
    }
}

/// The in-memory layout of a string value: a data pointer and a length.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawStr {
    /// Pointer to the string bytes.
    pub data: *const u8,
    /// Length in bytes.
    pub len: usize,
}

/// The in-memory layout of an interface slot: a descriptor reference widened
/// to a word, then the data word.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawAny {
    /// The [`TypeRef`] of the boxed value, as a word.
    pub typecode: usize,
    /// The boxed value's data word.
    pub word: usize,
}

/// Whether two polymorphic values are equal.
///
/// Two empty values are equal; an empty and a non-empty value are not.
/// Values of different types are never equal; values of the same type
/// compare structurally by kind. Aborts if a never-comparable kind (slice,
/// map, func) reaches the comparison — comparability must be checked by the
/// caller beforehand.
pub fn any_equal(store: &DescriptorStore<'_>, x: &AnyValue, y: &AnyValue) -> bool {
    if x.is_null() || y.is_null() {
        return x.is_null() && y.is_null();
    }
    if x.ty != y.ty {
        return false;
    }

    assert_eq!(
        store.word_size(),
        std::mem::size_of::<usize>(),
        "rtti: descriptor store word size does not match host"
    );

    let ty = store.type_at(x.ty);
    // Safety: the descriptors are trusted producer output and both words
    // were composed from live values of exactly this type, so every read
    // below stays within storage of the decoded size.
    unsafe { value_equal(ty, x.data_ptr(&ty), y.data_ptr(&ty)) }
}

/// Structural equality over the raw bytes of two values of type `ty`.
///
/// # Safety
///
/// `a` and `b` must point to initialized storage holding values of exactly
/// the type `ty` describes, valid for `ty.size()` bytes.
unsafe fn value_equal(ty: Type<'_>, a: *const u8, b: *const u8) -> bool {
    unsafe fn read<T: Copy>(p: *const u8) -> T {
        std::ptr::read_unaligned(p as *const T)
    }

    match ty.kind() {
        Kind::Bool | Kind::Int8 | Kind::Uint8 => read::<u8>(a) == read::<u8>(b),
        Kind::Int16 | Kind::Uint16 => read::<u16>(a) == read::<u16>(b),
        Kind::Int32 | Kind::Uint32 => read::<u32>(a) == read::<u32>(b),
        Kind::Int64 | Kind::Uint64 => read::<u64>(a) == read::<u64>(b),
        Kind::Int | Kind::Uint | Kind::Uintptr => read::<usize>(a) == read::<usize>(b),
        Kind::Float32 => read::<f32>(a) == read::<f32>(b),
        Kind::Float64 => read::<f64>(a) == read::<f64>(b),
        Kind::Complex64 => {
            read::<f32>(a) == read::<f32>(b) && read::<f32>(a.add(4)) == read::<f32>(b.add(4))
        }
        Kind::Complex128 => {
            read::<f64>(a) == read::<f64>(b) && read::<f64>(a.add(8)) == read::<f64>(b.add(8))
        }
        Kind::String => {
            let sa = read::<RawStr>(a);
            let sb = read::<RawStr>(b);
            if sa.len != sb.len {
                return false;
            }
            if sa.len == 0 {
                return true;
            }
            std::slice::from_raw_parts(sa.data, sa.len)
                == std::slice::from_raw_parts(sb.data, sb.len)
        }
        // Reference kinds compare by address.
        Kind::Pointer | Kind::UnsafePointer | Kind::Chan => {
            read::<usize>(a) == read::<usize>(b)
        }
        Kind::Array => {
            let elem = ty.elem();
            let stride = elem.size();
            for i in 0..ty.len() {
                if !value_equal(elem, a.add(i * stride), b.add(i * stride)) {
                    return false;
                }
            }
            true
        }
        Kind::Struct => {
            for field in ty.raw_fields() {
                let fty = ty.store().type_at(field.ty);
                let off = field.offset as usize;
                if !value_equal(fty, a.add(off), b.add(off)) {
                    return false;
                }
            }
            true
        }
        Kind::Interface => {
            // Unwrap one level and recurse on the boxed values.
            let sa = read::<RawAny>(a);
            let sb = read::<RawAny>(b);
            let xa = AnyValue::new(TypeRef::from_raw(sa.typecode as u32), sa.word);
            let xb = AnyValue::new(TypeRef::from_raw(sb.typecode as u32), sb.word);
            any_equal(&ty.store(), &xa, &xb)
        }
        k => panic!("rtti: comparing uncomparable {k} type"),
    }
}
