//! The descriptor store and references into it.
//!
//! A [`DescriptorStore`] wraps the immutable byte table produced at build
//! time, one record per distinct static type. All operations are pure reads;
//! the store is freely shared across threads without synchronization.
//!
//! A [`TypeRef`] is a `u32` byte offset into the store. Records are 4-byte
//! aligned, so the two low bits of a real offset are always zero; a non-zero
//! low-bit pattern encodes one to three levels of synthesized pointer
//! indirection on top of the referenced record and is never dereferenced.

use crate::error::StoreError;
use crate::layout;
use crate::ty::Type;

/// A reference to a type descriptor: a store offset plus a two-bit
/// indirection tag.
///
/// `TypeRef` equality is type identity. The producer emits exactly one
/// canonical record per distinct static type, so two references are the same
/// type if and only if they are bit-for-bit equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TypeRef(u32);

impl TypeRef {
    /// The null reference: the only value with the `Invalid` kind,
    /// representing an absent polymorphic value.
    pub const NULL: TypeRef = TypeRef(0);

    /// Maximum synthesized indirection depth encodable in the tag bits.
    pub const MAX_TAG: u8 = 3;

    /// Build a reference from a record byte offset. The offset must be
    /// 4-byte aligned; the low bits are reserved for the indirection tag.
    pub fn from_offset(offset: u32) -> TypeRef {
        debug_assert_eq!(offset & 0b11, 0, "descriptor offsets are 4-byte aligned");
        TypeRef(offset)
    }

    /// Reinterpret a raw `u32`, tag bits included. Used when a reference is
    /// read back out of an interface slot.
    pub fn from_raw(raw: u32) -> TypeRef {
        TypeRef(raw)
    }

    /// The raw `u32` representation, tag bits included.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is the null reference.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The synthesized indirection depth (0 through 3).
    pub fn tag(self) -> u8 {
        (self.0 & 0b11) as u8
    }

    /// The reference with the tag bits cleared.
    pub fn base(self) -> TypeRef {
        TypeRef(self.0 & !0b11)
    }

    /// The same record with the given indirection depth.
    pub fn with_tag(self, tag: u8) -> TypeRef {
        debug_assert!(tag <= Self::MAX_TAG);
        TypeRef(self.base().0 | tag as u32)
    }
}

/// The immutable table of type descriptors.
///
/// Construction validates the store envelope only; record contents are
/// trusted producer output, and decoding a corrupt record is a fatal
/// internal-consistency violation rather than a recoverable error.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorStore<'d> {
    data: &'d [u8],
    word_size: usize,
}

impl<'d> DescriptorStore<'d> {
    /// Wrap a descriptor table, checking its header.
    pub fn new(data: &'d [u8]) -> Result<DescriptorStore<'d>, StoreError> {
        if data.len() < layout::HEADER_LEN {
            return Err(StoreError::Truncated(data.len()));
        }
        if data[..4] != layout::MAGIC {
            return Err(StoreError::BadMagic);
        }
        if data[layout::HDR_VERSION] != layout::VERSION {
            return Err(StoreError::UnsupportedVersion(data[layout::HDR_VERSION]));
        }
        let word_size = data[layout::HDR_WORD_SIZE];
        if word_size != 4 && word_size != 8 {
            return Err(StoreError::UnsupportedWordSize(word_size));
        }
        Ok(DescriptorStore {
            data,
            word_size: word_size as usize,
        })
    }

    /// The target word size in bytes recorded by the producer.
    pub fn word_size(&self) -> usize {
        self.word_size
    }

    /// The raw store bytes.
    pub fn as_bytes(&self) -> &'d [u8] {
        self.data
    }

    /// The [`Type`] handle for a reference into this store.
    pub fn type_at(&self, tref: TypeRef) -> Type<'d> {
        Type::new(*self, tref)
    }

    pub(crate) fn u8_at(&self, off: usize) -> u8 {
        self.data[off]
    }

    pub(crate) fn u16_at(&self, off: usize) -> u16 {
        u16::from_le_bytes([self.data[off], self.data[off + 1]])
    }

    pub(crate) fn u32_at(&self, off: usize) -> u32 {
        u32::from_le_bytes([
            self.data[off],
            self.data[off + 1],
            self.data[off + 2],
            self.data[off + 3],
        ])
    }

    /// Read the descriptor reference stored at `off`.
    pub(crate) fn ref_at(&self, off: usize) -> TypeRef {
        TypeRef::from_raw(self.u32_at(off))
    }

    /// Read a null-terminated string starting at `off` as a zero-copy view
    /// over exactly that byte range.
    pub(crate) fn str_z(&self, off: usize) -> &'d str {
        let mut end = off;
        while self.data[end] != 0 {
            end += 1;
        }
        match std::str::from_utf8(&self.data[off..end]) {
            Ok(s) => s,
            Err(_) => panic!("rtti: corrupt name data"),
        }
    }

    /// Resolve an interned string reference; reference 0 is the empty string.
    pub(crate) fn interned_str(&self, sref: u32) -> &'d str {
        if sref == 0 {
            ""
        } else {
            self.str_z(sref as usize)
        }
    }
}

/// Decode a uvarint32 from the front of `buf`, returning the value and the
/// number of bytes consumed.
pub(crate) fn uvarint32(buf: &[u8]) -> (u32, usize) {
    let mut x = 0u32;
    let mut s = 0u32;
    for (i, &b) in buf.iter().take(layout::MAX_VARINT_LEN32).enumerate() {
        if b < 0x80 {
            return (x | (b as u32) << s, i + 1);
        }
        x |= ((b & 0x7f) as u32) << s;
        s += 7;
    }
    panic!("rtti: corrupt varint in field record")
}
