//! Pointer-layout classification for the garbage collector.
//!
//! The collector asks one question of a type: where can pointers live in a
//! value's backing storage? The answer is derived purely from the kind; a
//! type this table cannot classify is scanned conservatively.

use crate::kind::Kind;
use crate::ty::Type;

/// How values of a type hold pointers, for collector scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcLayout {
    /// The value contains no pointers at all.
    NoPointers,
    /// The value is exactly one pointer word.
    SinglePointer,
    /// The value has the string layout: a data pointer and a length.
    StringLayout,
    /// The value has the slice layout: a data pointer, a length, and a
    /// capacity.
    SliceLayout,
    /// Unclassifiable here; the collector must scan conservatively.
    Unknown,
}

impl Type<'_> {
    /// The pointer layout of values of this type.
    pub fn gc_layout(&self) -> GcLayout {
        let kind = self.kind();
        if kind < Kind::String {
            return GcLayout::NoPointers;
        }
        match kind {
            Kind::Pointer | Kind::UnsafePointer | Kind::Chan | Kind::Map => {
                GcLayout::SinglePointer
            }
            Kind::String => GcLayout::StringLayout,
            Kind::Slice => GcLayout::SliceLayout,
            _ => GcLayout::Unknown,
        }
    }
}
