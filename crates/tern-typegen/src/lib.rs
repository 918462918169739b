//! Tern Type Descriptor Generator
//!
//! Build-time producer of the binary descriptor stores decoded by
//! [`tern_rtti`]. The compiler back end feeds every static type of a
//! program through a [`StoreBuilder`], which interns one canonical record
//! per distinct type, lays out structs, folds comparability flags, and
//! emits the byte table the runtime links in.
//!
//! The builder validates its inputs; the emitted bytes are trusted
//! unconditionally by the decoder, so every invariant of the format is
//! enforced here.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod builder;
mod error;

pub use builder::{FieldDef, StoreBuilder, WordSize};
pub use error::BuildError;
