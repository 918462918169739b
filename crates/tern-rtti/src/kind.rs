//! Type kinds and the descriptor meta byte.
//!
//! The first byte of every descriptor record packs a 5-bit [`Kind`] together
//! with three flags: whether the type is named, whether its values are
//! comparable, and whether the byte-wise hash/equality fast path applies.

use std::fmt;

/// Mask to apply to the meta byte to extract the [`Kind`] value.
pub const KIND_MASK: u8 = 31;
/// Meta flag: this descriptor belongs to a named type.
pub const FLAG_NAMED: u8 = 32;
/// Meta flag: values of this type are comparable.
pub const FLAG_COMPARABLE: u8 = 64;
/// Meta flag: values of this type can be hashed and compared byte-wise.
pub const FLAG_BINARY: u8 = 128;

/// The coarse category of a type.
///
/// The numbering is part of the descriptor format and must stay in sync with
/// the producer in `tern-typegen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Kind {
    /// The kind of the null descriptor reference (an absent value).
    Invalid = 0,
    /// `bool`
    Bool,
    /// `int` (word-sized signed integer)
    Int,
    /// `int8`
    Int8,
    /// `int16`
    Int16,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint` (word-sized unsigned integer)
    Uint,
    /// `uint8`
    Uint8,
    /// `uint16`
    Uint16,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `uintptr`
    Uintptr,
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `complex64`
    Complex64,
    /// `complex128`
    Complex128,
    /// `string`
    String,
    /// An untyped raw pointer.
    UnsafePointer,
    /// A channel.
    Chan,
    /// An interface value.
    Interface,
    /// A typed pointer.
    Pointer,
    /// A slice.
    Slice,
    /// A fixed-length array.
    Array,
    /// A function value.
    Func,
    /// A map.
    Map,
    /// A struct.
    Struct,
}

impl Kind {
    /// Decode a kind from a descriptor meta byte.
    ///
    /// Descriptors are produced by a trusted build step; a kind value outside
    /// the defined range is an internal-consistency violation and aborts.
    pub fn from_meta(meta: u8) -> Kind {
        Kind::from_u8(meta & KIND_MASK)
    }

    /// Decode a kind from its raw numeric value.
    pub fn from_u8(raw: u8) -> Kind {
        match raw {
            0 => Kind::Invalid,
            1 => Kind::Bool,
            2 => Kind::Int,
            3 => Kind::Int8,
            4 => Kind::Int16,
            5 => Kind::Int32,
            6 => Kind::Int64,
            7 => Kind::Uint,
            8 => Kind::Uint8,
            9 => Kind::Uint16,
            10 => Kind::Uint32,
            11 => Kind::Uint64,
            12 => Kind::Uintptr,
            13 => Kind::Float32,
            14 => Kind::Float64,
            15 => Kind::Complex64,
            16 => Kind::Complex128,
            17 => Kind::String,
            18 => Kind::UnsafePointer,
            19 => Kind::Chan,
            20 => Kind::Interface,
            21 => Kind::Pointer,
            22 => Kind::Slice,
            23 => Kind::Array,
            24 => Kind::Func,
            25 => Kind::Map,
            26 => Kind::Struct,
            _ => panic!("rtti: corrupt type kind {raw}"),
        }
    }

    /// Whether this is one of the basic kinds (`Bool` through
    /// `UnsafePointer`), i.e. a type with no element or field structure.
    pub fn is_basic(self) -> bool {
        self >= Kind::Bool && self <= Kind::UnsafePointer
    }

    /// Whether this is one of the arithmetic kinds (`Int` through
    /// `Complex128`), the kinds for which a bit width is defined.
    pub fn is_arithmetic(self) -> bool {
        self >= Kind::Int && self <= Kind::Complex128
    }

    /// The source-level name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::String => "string",
            Kind::UnsafePointer => "unsafe.Pointer",
            Kind::Chan => "chan",
            Kind::Interface => "interface",
            Kind::Pointer => "ptr",
            Kind::Slice => "slice",
            Kind::Array => "array",
            Kind::Func => "func",
            Kind::Map => "map",
            Kind::Struct => "struct",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A channel type's direction.
///
/// For channel descriptors the method-count slot is overloaded to store the
/// direction instead; channels have no methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChanDir {
    /// `<-chan T`: receive only.
    Recv = 1,
    /// `chan<- T`: send only.
    Send = 2,
    /// `chan T`: both directions.
    Both = 3,
}

impl ChanDir {
    /// Decode a direction from the overloaded method-count slot.
    pub fn from_raw(raw: u16) -> ChanDir {
        match raw {
            1 => ChanDir::Recv,
            2 => ChanDir::Send,
            3 => ChanDir::Both,
            _ => panic!("rtti: corrupt channel direction {raw}"),
        }
    }
}
