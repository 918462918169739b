//! Tern Runtime Type Information
//!
//! Decoder for the compact binary type descriptors the Tern compiler emits
//! alongside compiled code. One immutable record per distinct static type
//! powers dynamic type identity, interface value equality, and reflection
//! (name, kind, size, field, and method-count queries) on targets where
//! every byte of code and data counts.
//!
//! Descriptors are produced once at build time (see `tern-typegen`), never
//! mutated, and never freed. All decode operations are pure reads over the
//! shared table: no locking, no blocking, and no allocation except when a
//! caller materializes a borrowed name or tag into an owned string.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod algebra;
pub mod any;
pub mod error;
pub mod field;
pub mod gc;
pub mod kind;
pub mod layout;
pub mod store;
pub mod tag;
pub mod ty;

pub use any::{any_equal, AnyValue, RawAny, RawStr};
pub use error::{AccessError, StoreError};
pub use field::StructField;
pub use gc::GcLayout;
pub use kind::{ChanDir, Kind};
pub use store::{DescriptorStore, TypeRef};
pub use tag::StructTag;
pub use ty::Type;
