//! The variant decoder: kind classification and kind-specific accessors.
//!
//! A [`Type`] is a cheap copyable handle pairing a store with a [`TypeRef`].
//! Type identity is reference identity: the producer emits one canonical
//! record per distinct static type, so two handles are the same type exactly
//! when their references are equal. Structural layouts are never compared.
//!
//! Calling an accessor inappropriate to the handle's kind is a fatal abort
//! (see [`crate::error::AccessError`]); descriptors come from a trusted
//! producer and a kind mismatch is always a caller bug, never data.

use std::fmt;

use crate::error::kind_misuse;
use crate::kind::{ChanDir, Kind, FLAG_BINARY, FLAG_COMPARABLE, FLAG_NAMED};
use crate::layout;
use crate::store::{DescriptorStore, TypeRef};

/// A decoded view of one type descriptor.
#[derive(Clone, Copy)]
pub struct Type<'a> {
    store: DescriptorStore<'a>,
    tref: TypeRef,
}

impl PartialEq for Type<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tref == other.tref
    }
}

impl Eq for Type<'_> {}

impl fmt::Debug for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("ref", &self.tref)
            .field("kind", &self.kind())
            .finish()
    }
}

impl<'a> Type<'a> {
    pub(crate) fn new(store: DescriptorStore<'a>, tref: TypeRef) -> Type<'a> {
        Type { store, tref }
    }

    /// The reference this handle decodes.
    pub fn type_ref(&self) -> TypeRef {
        self.tref
    }

    pub(crate) fn store(&self) -> DescriptorStore<'a> {
        self.store
    }

    /// Byte offset of the base record, tag bits cleared.
    pub(crate) fn base(&self) -> usize {
        self.tref.base().raw() as usize
    }

    fn meta(&self) -> u8 {
        debug_assert_eq!(self.tref.tag(), 0);
        debug_assert!(!self.tref.is_null());
        self.store.u8_at(self.base() + layout::META)
    }

    fn at(&self, rel: usize) -> Type<'a> {
        self.store.type_at(self.store.ref_at(self.base() + rel))
    }

    /// The kind of this type.
    ///
    /// The null reference is the only value that yields `Invalid`. A tagged
    /// reference is classified as `Pointer` from its own low bits, without
    /// reading any record memory.
    pub fn kind(&self) -> Kind {
        if self.tref.is_null() {
            return Kind::Invalid;
        }
        if self.tref.tag() != 0 {
            return Kind::Pointer;
        }
        Kind::from_meta(self.meta())
    }

    /// Whether this is a named type.
    pub fn is_named(&self) -> bool {
        if self.tref.is_null() || self.tref.tag() != 0 {
            return false;
        }
        self.meta() & FLAG_NAMED != 0
    }

    /// For a named type, the underlying type reached in exactly one hop;
    /// otherwise the type itself.
    pub fn underlying(&self) -> Type<'a> {
        if self.is_named() {
            self.at(layout::ELEM)
        } else {
            *self
        }
    }

    /// The element type of a pointer, channel, slice, array, or map.
    ///
    /// For a synthesized pointer this strips one level of indirection by
    /// decrementing the tag. Aborts for any other kind.
    pub fn elem(&self) -> Type<'a> {
        let tag = self.tref.tag();
        if tag != 0 {
            return self.store.type_at(self.tref.with_tag(tag - 1));
        }
        let u = self.underlying();
        match u.kind() {
            Kind::Pointer => u.at(layout::PTR_ELEM),
            Kind::Chan | Kind::Slice | Kind::Array | Kind::Map => u.at(layout::ELEM),
            k => kind_misuse("Elem", k),
        }
    }

    /// The key type of a map. Aborts for other kinds.
    pub fn key(&self) -> Type<'a> {
        let u = self.underlying();
        if u.kind() != Kind::Map {
            kind_misuse("Key", u.kind());
        }
        u.at(layout::MAP_KEY)
    }

    /// The pointer type of this type.
    ///
    /// Named and struct types carry a dedicated pointer-type reference;
    /// pointer kinds synthesize one more indirection level by incrementing
    /// the reference tag, which is capped at [`TypeRef::MAX_TAG`] levels.
    pub fn pointer_to(&self) -> Type<'a> {
        if self.is_named() {
            return self.at(layout::PTR_TO);
        }
        match self.kind() {
            Kind::Pointer => {
                let tag = self.tref.tag();
                if tag == TypeRef::MAX_TAG {
                    panic!("rtti: unsupported indirection depth");
                }
                self.store.type_at(self.tref.with_tag(tag + 1))
            }
            Kind::Struct
            | Kind::Interface
            | Kind::Chan
            | Kind::Slice
            | Kind::Array
            | Kind::Map => self.at(layout::PTR_TO),
            k if k.is_basic() || k == Kind::Func => self.at(layout::BASIC_PTR_TO),
            k => kind_misuse("PointerTo", k),
        }
    }

    /// The number of elements of an array type. Aborts for other kinds.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let u = self.underlying();
        if u.kind() != Kind::Array {
            kind_misuse("Len", u.kind());
        }
        self.store.u32_at(u.base() + layout::ARRAY_LEN) as usize
    }

    /// The slice type corresponding to an array type. Aborts for other
    /// kinds.
    pub fn slice_of(&self) -> Type<'a> {
        let u = self.underlying();
        if u.kind() != Kind::Array {
            kind_misuse("SliceOf", u.kind());
        }
        u.at(layout::ARRAY_SLICE_OF)
    }

    /// The number of bytes needed to store a value of this type.
    pub fn size(&self) -> usize {
        let word = self.store.word_size();
        match self.kind() {
            Kind::Bool | Kind::Int8 | Kind::Uint8 => 1,
            Kind::Int16 | Kind::Uint16 => 2,
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => 4,
            Kind::Int64 | Kind::Uint64 | Kind::Float64 | Kind::Complex64 => 8,
            Kind::Complex128 => 16,
            Kind::Int
            | Kind::Uint
            | Kind::Uintptr
            | Kind::UnsafePointer
            | Kind::Chan
            | Kind::Map
            | Kind::Pointer => word,
            Kind::String | Kind::Interface | Kind::Func => 2 * word,
            Kind::Slice => 3 * word,
            Kind::Array => self.elem().size() * self.len(),
            Kind::Struct => {
                let u = self.underlying();
                self.store.u32_at(u.base() + layout::STRUCT_SIZE) as usize
            }
            k => kind_misuse("Size", k),
        }
    }

    /// The alignment in bytes of a value of this type.
    pub fn align(&self) -> usize {
        let word = self.store.word_size();
        match self.kind() {
            Kind::Bool | Kind::Int8 | Kind::Uint8 => 1,
            Kind::Int16 | Kind::Uint16 => 2,
            Kind::Int32 | Kind::Uint32 | Kind::Float32 | Kind::Complex64 => 4,
            Kind::Int64 | Kind::Uint64 | Kind::Float64 | Kind::Complex128 => 8,
            Kind::Int
            | Kind::Uint
            | Kind::Uintptr
            | Kind::UnsafePointer
            | Kind::Chan
            | Kind::Map
            | Kind::Pointer
            | Kind::String
            | Kind::Interface
            | Kind::Func
            | Kind::Slice => word,
            Kind::Array => self.elem().align(),
            Kind::Struct => {
                let mut align = 1;
                for field in self.raw_fields() {
                    let field_align = self.store.type_at(field.ty).align();
                    if field_align > align {
                        align = field_align;
                    }
                }
                align
            }
            k => kind_misuse("Align", k),
        }
    }

    /// The alignment of this type when used as a struct field. Currently an
    /// alias for [`Type::align`].
    pub fn field_align(&self) -> usize {
        self.align()
    }

    /// The bit width of an arithmetic type. Aborts for non-arithmetic kinds.
    pub fn bits(&self) -> usize {
        let kind = self.kind();
        if !kind.is_arithmetic() {
            kind_misuse("Bits", kind);
        }
        self.size() * 8
    }

    /// The number of methods in this type's method set.
    ///
    /// Synthesized pointer types have none; kinds without a method-count
    /// field have none by construction.
    pub fn num_method(&self) -> usize {
        if self.tref.is_null() || self.tref.tag() != 0 {
            return 0;
        }
        if self.is_named() {
            return self.store.u16_at(self.base() + layout::NUM_METHOD) as usize;
        }
        match self.kind() {
            Kind::Pointer | Kind::Struct | Kind::Interface => {
                self.store.u16_at(self.base() + layout::NUM_METHOD) as usize
            }
            _ => 0,
        }
    }

    /// The direction of a channel type. Aborts for other kinds.
    pub fn chan_dir(&self) -> ChanDir {
        let u = self.underlying();
        if u.kind() != Kind::Chan {
            kind_misuse("ChanDir", u.kind());
        }
        // The method-count slot is overloaded to hold the direction.
        ChanDir::from_raw(self.store.u16_at(u.base() + layout::NUM_METHOD))
    }

    /// Whether values of this type are comparable. Read from the flag
    /// precomputed by the producer, never recomputed from the structure.
    pub fn comparable(&self) -> bool {
        if self.tref.is_null() {
            return false;
        }
        if self.tref.tag() != 0 {
            return true;
        }
        self.meta() & FLAG_COMPARABLE != 0
    }

    /// Whether values of this type hash and compare byte-wise, enabling the
    /// fast map path.
    pub fn is_binary_hashable(&self) -> bool {
        if self.tref.is_null() {
            return false;
        }
        if self.tref.tag() != 0 {
            return true;
        }
        self.meta() & FLAG_BINARY != 0
    }

    /// The full stored name of a named type, package qualifier included.
    fn stored_name(&self) -> &'a str {
        self.store.str_z(self.base() + layout::NAMED_NAME)
    }

    /// The type's name within its package for a named type, or the kind
    /// name for basic unnamed types, or the empty string otherwise.
    pub fn name(&self) -> &'a str {
        if self.is_named() {
            // Split on the last separator: identifiers never contain a dot,
            // but package qualifiers may.
            let full = self.stored_name();
            return match full.rfind('.') {
                Some(dot) => &full[dot + 1..],
                None => panic!("rtti: corrupt name data"),
            };
        }
        let kind = self.kind();
        if kind.is_basic() {
            if kind == Kind::UnsafePointer {
                "Pointer"
            } else {
                kind.name()
            }
        } else {
            ""
        }
    }

    /// The package path qualifying a named type, or the empty string for
    /// unnamed types.
    pub fn pkg_path(&self) -> &'a str {
        if self.is_named() {
            let sref = self.store.u32_at(self.base() + layout::NAMED_PKG);
            self.store.interned_str(sref)
        } else {
            ""
        }
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_named() {
            let full = self.stored_name();
            return f.write_str(full.strip_prefix('.').unwrap_or(full));
        }
        match self.kind() {
            Kind::Chan => {
                let elem = self.elem().to_string();
                match self.chan_dir() {
                    ChanDir::Send => write!(f, "chan<- {elem}"),
                    ChanDir::Recv => write!(f, "<-chan {elem}"),
                    ChanDir::Both => {
                        if elem.starts_with('<') {
                            // A receive-channel element binds the arrow to
                            // the leftmost chan; parenthesize it.
                            write!(f, "chan ({elem})")
                        } else {
                            write!(f, "chan {elem}")
                        }
                    }
                }
            }
            Kind::Pointer => write!(f, "*{}", self.elem()),
            Kind::Slice => write!(f, "[]{}", self.elem()),
            Kind::Array => write!(f, "[{}]{}", self.len(), self.elem()),
            Kind::Map => write!(f, "map[{}]{}", self.key(), self.elem()),
            Kind::Struct => {
                let num_field = self.num_field();
                if num_field == 0 {
                    return f.write_str("struct {}");
                }
                f.write_str("struct {")?;
                for (i, field) in self.raw_fields().enumerate() {
                    write!(f, " {} {}", field.name, self.store().type_at(field.ty))?;
                    if let Some(tag) = field.tag {
                        write!(f, " {tag:?}")?;
                    }
                    if i < num_field - 1 {
                        f.write_str(";")?;
                    }
                }
                f.write_str(" }")
            }
            Kind::Interface => f.write_str("interface {}"),
            kind => f.write_str(kind.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout;

    // A minimal hand-assembled store: one bool record at offset 8 and its
    // pointer record at offset 16.
    fn tiny_store() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&layout::MAGIC);
        data.push(layout::VERSION);
        data.push(8); // word size
        data.extend_from_slice(&[0, 0]);
        // offset 8: bool
        data.push(Kind::Bool as u8 | FLAG_COMPARABLE | FLAG_BINARY);
        data.extend_from_slice(&16u32.to_le_bytes()); // ptr_to
        data.extend_from_slice(&[0, 0, 0]); // pad to offset 16
        // offset 16: *bool
        data.push(Kind::Pointer as u8 | FLAG_COMPARABLE | FLAG_BINARY);
        data.extend_from_slice(&0u16.to_le_bytes()); // num_method
        data.extend_from_slice(&8u32.to_le_bytes()); // elem
        data
    }

    #[test]
    fn test_basic_decode() {
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        let b = store.type_at(TypeRef::from_offset(8));

        assert_eq!(b.kind(), Kind::Bool);
        assert_eq!(b.size(), 1);
        assert_eq!(b.align(), 1);
        assert_eq!(b.name(), "bool");
        assert_eq!(b.pkg_path(), "");
        assert!(b.comparable());
        assert!(b.is_binary_hashable());
        assert!(!b.is_named());
        assert_eq!(b.num_method(), 0);
        assert_eq!(b.to_string(), "bool");
        assert_eq!(b.underlying(), b);
    }

    #[test]
    fn test_pointer_roundtrip() {
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        let b = store.type_at(TypeRef::from_offset(8));

        let p = b.pointer_to();
        assert_eq!(p.kind(), Kind::Pointer);
        assert_eq!(p.type_ref(), TypeRef::from_offset(16));
        assert_eq!(p.elem(), b);
        assert_eq!(p.size(), 8);
        assert_eq!(p.to_string(), "*bool");

        // Synthesized levels above the real pointer record.
        let pp = p.pointer_to();
        assert_eq!(pp.kind(), Kind::Pointer);
        assert_eq!(pp.type_ref().tag(), 1);
        assert_eq!(pp.elem(), p);
        assert_eq!(pp.to_string(), "**bool");
        assert_eq!(pp.elem().pointer_to(), pp);
        assert_eq!(pp.num_method(), 0);
        assert!(pp.comparable());
    }

    #[test]
    #[should_panic(expected = "unsupported indirection depth")]
    fn test_indirection_cap() {
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        let mut t = store.type_at(TypeRef::from_offset(16));
        for _ in 0..4 {
            t = t.pointer_to();
        }
    }

    #[test]
    fn test_tagged_kind_reads_no_memory() {
        // The base offset points past the end of the store; classifying the
        // tagged reference must not touch record memory.
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        let t = store.type_at(TypeRef::from_offset(1 << 20).with_tag(2));
        assert_eq!(t.kind(), Kind::Pointer);
        assert!(t.comparable());
        assert_eq!(t.num_method(), 0);
    }

    #[test]
    fn test_null_is_invalid() {
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        let t = store.type_at(TypeRef::NULL);
        assert_eq!(t.kind(), Kind::Invalid);
        assert!(!t.comparable());
        assert_eq!(t.num_method(), 0);
    }

    #[test]
    #[should_panic(expected = "call of Elem on bool type")]
    fn test_elem_misuse() {
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        store.type_at(TypeRef::from_offset(8)).elem();
    }

    #[test]
    #[should_panic(expected = "call of Bits on bool type")]
    fn test_bits_misuse() {
        let data = tiny_store();
        let store = DescriptorStore::new(&data).unwrap();
        store.type_at(TypeRef::from_offset(8)).bits();
    }
}
