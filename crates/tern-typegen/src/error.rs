//! Producer-side validation errors.

use tern_rtti::Kind;
use thiserror::Error;

/// Errors raised while building a descriptor store.
///
/// These are producer-input validation failures; once a store is emitted,
/// the decoder in `tern-rtti` trusts it unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A non-basic kind was passed to [`crate::StoreBuilder::basic`].
    #[error("{0} is not a basic kind")]
    NotBasic(Kind),

    /// An identifier is empty or contains a reserved character.
    #[error("invalid identifier {0:?}")]
    InvalidName(String),

    /// An interned string contains an interior NUL byte.
    #[error("string contains a NUL byte")]
    NulInString,

    /// A field tag exceeds the 255-byte length prefix.
    #[error("tag of field {0:?} exceeds 255 bytes")]
    TagTooLong(String),

    /// A struct declares more fields than the format can count.
    #[error("struct has {0} fields, more than the format supports")]
    TooManyFields(usize),

    /// A struct's computed size exceeds the 32-bit size field.
    #[error("struct size {0} exceeds the format limit")]
    StructTooLarge(usize),

    /// A named type was redeclared with a different underlying type.
    #[error("named type {0:?} already declared with a different underlying type")]
    DuplicateNamed(String),

    /// The null reference was passed where a type is required.
    #[error("null type reference")]
    NullRef,

    /// A synthesized (tagged) reference was passed to the builder; only
    /// direct record references may be stored.
    #[error("synthesized pointer reference cannot be stored")]
    TaggedRef,

    /// A reference does not address a record in this builder.
    #[error("dangling type reference {0:#x}")]
    DanglingRef(u32),
}
