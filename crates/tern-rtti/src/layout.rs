//! Byte-level layout of the descriptor store.
//!
//! These constants are shared between the decoder in this crate and the
//! producer in `tern-typegen`; they are the single definition of the format.
//!
//! The store is one immutable byte buffer, little-endian throughout:
//!
//! ```text
//! header (8 bytes): magic "TRTI", version u8, word size u8, 2 pad bytes
//! records, each 4-byte aligned:
//!   basic, func:  meta u8 | ptr_to u32
//!   interface:    meta u8 | num_method u16 | ptr_to u32
//!   chan, slice:  meta u8 | num_method u16 | ptr_to u32 | elem u32
//!   pointer:      meta u8 | num_method u16 | elem u32            (no ptr_to)
//!   array:        meta u8 | num_method u16 | ptr_to u32 | elem u32
//!                 | len u32 | slice_of u32
//!   map:          meta u8 | num_method u16 | ptr_to u32 | elem u32 | key u32
//!   named:        meta u8 | num_method u16 | ptr_to u32 | underlying u32
//!                 | pkg u32 | name, null terminated
//!   struct:       meta u8 | num_method u16 | ptr_to u32 | pkg u32
//!                 | size u32 | num_field u16 | field records
//! field record (variable length, declaration order):
//!   type u32 | flags u8 | uvarint32 offset | name, null terminated
//!   | [tag len u8 | tag bytes]   -- present iff the has-tag flag is set
//! ```
//!
//! Pointer records carry no `ptr_to` reference; the pointer type of a pointer
//! type is synthesized by tagging the reference instead, which is what keeps
//! the format finite. A named type's `meta` kind bits hold the kind of its
//! underlying type, so kind dispatch never needs the extra hop.

/// Magic bytes at the start of every store.
pub const MAGIC: [u8; 4] = *b"TRTI";
/// Current format version.
pub const VERSION: u8 = 1;
/// Length of the fixed store header. Records start here, so a byte offset of
/// zero never addresses a record and serves as the null reference.
pub const HEADER_LEN: usize = 8;
/// Header byte holding the format version.
pub const HDR_VERSION: usize = 4;
/// Header byte holding the target word size in bytes.
pub const HDR_WORD_SIZE: usize = 5;

/// Offset of the meta byte. Every variant stores it first.
pub const META: usize = 0;
/// Offset of the pointer-type reference in basic and func records.
pub const BASIC_PTR_TO: usize = 1;
/// Offset of the method count (u16). Overloaded as the channel direction in
/// chan records.
pub const NUM_METHOD: usize = 1;
/// Offset of the element reference in pointer records.
pub const PTR_ELEM: usize = 3;
/// Offset of the pointer-type reference in every non-basic, non-pointer
/// record.
pub const PTR_TO: usize = 3;
/// Offset of the element reference in chan/slice/array/map records and of
/// the underlying reference in named records.
pub const ELEM: usize = 7;
/// Offset of the element count in array records.
pub const ARRAY_LEN: usize = 11;
/// Offset of the corresponding-slice reference in array records.
pub const ARRAY_SLICE_OF: usize = 15;
/// Offset of the key reference in map records.
pub const MAP_KEY: usize = 11;
/// Offset of the package-string reference in named records.
pub const NAMED_PKG: usize = 11;
/// Offset of the inline null-terminated name in named records.
pub const NAMED_NAME: usize = 15;
/// Offset of the package-string reference in struct records.
pub const STRUCT_PKG: usize = 7;
/// Offset of the byte size in struct records.
pub const STRUCT_SIZE: usize = 11;
/// Offset of the field count in struct records.
pub const STRUCT_NUM_FIELD: usize = 15;
/// Offset of the first field record in struct records.
pub const STRUCT_FIELDS: usize = 17;

/// Field flag: the field is anonymous.
pub const FIELD_ANONYMOUS: u8 = 1;
/// Field flag: a length-prefixed tag string follows the name.
pub const FIELD_HAS_TAG: u8 = 2;
/// Field flag: the field is exported.
pub const FIELD_EXPORTED: u8 = 4;
/// Field flag: the field is embedded.
pub const FIELD_EMBEDDED: u8 = 8;

/// Maximum encoded length of a uvarint32.
pub const MAX_VARINT_LEN32: usize = 5;
