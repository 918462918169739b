//! Type algebra: assignability, interface implementation, and overflow
//! checks.

use crate::error::kind_misuse;
use crate::kind::Kind;
use crate::ty::Type;

impl Type<'_> {
    /// Whether a value of this type is assignable to a variable of type `u`.
    ///
    /// True for identical descriptors, for types sharing an underlying
    /// descriptor when at most one side is named, and for any target that is
    /// the empty interface. Assignability to a non-empty interface would
    /// need method-set data the descriptors do not carry and aborts as
    /// unimplemented rather than approving silently.
    pub fn assignable_to(&self, u: Type<'_>) -> bool {
        if self.type_ref() == u.type_ref() {
            return true;
        }

        if self.underlying().type_ref() == u.underlying().type_ref()
            && (!self.is_named() || !u.is_named())
        {
            return true;
        }

        if u.kind() == Kind::Interface && u.num_method() == 0 {
            return true;
        }
        if u.kind() == Kind::Interface {
            panic!("rtti: not implemented: assignability to a non-empty interface");
        }
        false
    }

    /// Whether this type implements the interface type `u`. Aborts if `u`
    /// is not an interface.
    pub fn implements(&self, u: Type<'_>) -> bool {
        if u.kind() != Kind::Interface {
            kind_misuse("Implements", u.kind());
        }
        self.assignable_to(u)
    }

    /// Whether the `i64` value `x` cannot be represented by this type.
    /// Aborts for kinds outside the signed integer family.
    pub fn overflow_int(&self, x: i64) -> bool {
        match self.kind() {
            Kind::Int | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64 => {
                let bits = self.bits() as u32;
                let trunc = (x << (64 - bits)) >> (64 - bits);
                x != trunc
            }
            k => kind_misuse("OverflowInt", k),
        }
    }

    /// Whether the `u64` value `x` cannot be represented by this type.
    /// Aborts for kinds outside the unsigned integer family.
    pub fn overflow_uint(&self, x: u64) -> bool {
        match self.kind() {
            Kind::Uint
            | Kind::Uintptr
            | Kind::Uint8
            | Kind::Uint16
            | Kind::Uint32
            | Kind::Uint64 => {
                let bits = self.bits() as u32;
                let trunc = (x << (64 - bits)) >> (64 - bits);
                x != trunc
            }
            k => kind_misuse("OverflowUint", k),
        }
    }

    /// Whether the `f64` value `x` cannot be represented by this type.
    /// Aborts for non-float kinds.
    pub fn overflow_float(&self, x: f64) -> bool {
        match self.kind() {
            Kind::Float32 => overflow_f32(x),
            Kind::Float64 => false,
            k => kind_misuse("OverflowFloat", k),
        }
    }

    /// Whether the complex value `(re, im)` cannot be represented by this
    /// type. Aborts for non-complex kinds. A complex128 never overflows: no
    /// wider complex kind exists above it.
    pub fn overflow_complex(&self, re: f64, im: f64) -> bool {
        match self.kind() {
            Kind::Complex64 => overflow_f32(re) || overflow_f32(im),
            Kind::Complex128 => false,
            k => kind_misuse("OverflowComplex", k),
        }
    }
}

fn overflow_f32(x: f64) -> bool {
    let x = x.abs();
    x.is_finite() && x > f32::MAX as f64
}
