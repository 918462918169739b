//! Engine errors.
//!
//! Two failure classes exist. Misuse of a kind-specific accessor is a fatal,
//! non-recoverable abort: the panic payload is the [`AccessError`] rendering,
//! which names the offending operation and the actual kind. Lookup misses
//! (an absent or ambiguous struct field) are ordinary `Option` results and
//! never abort.

use crate::kind::Kind;
use thiserror::Error;

/// A malformed descriptor store header.
///
/// Record contents past the header are trusted producer output and are not
/// validated; only the store envelope is checked on construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The buffer is shorter than the fixed header.
    #[error("descriptor store truncated: {0} bytes")]
    Truncated(usize),

    /// The magic bytes do not identify a descriptor store.
    #[error("bad descriptor store magic")]
    BadMagic,

    /// The store was produced by an incompatible format version.
    #[error("unsupported descriptor format version {0}")]
    UnsupportedVersion(u8),

    /// The recorded word size is not 4 or 8 bytes.
    #[error("unsupported word size {0}")]
    UnsupportedWordSize(u8),
}

/// Payload of the panic raised when a kind-specific accessor is invoked on a
/// descriptor of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rtti: call of {method} on {kind} type")]
pub struct AccessError {
    /// The accessor that was misused.
    pub method: &'static str,
    /// The kind it was invoked on.
    pub kind: Kind,
}

/// Abort with an [`AccessError`] for the given operation and kind.
pub(crate) fn kind_misuse(method: &'static str, kind: Kind) -> ! {
    panic!("{}", AccessError { method, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_error_message() {
        let err = AccessError {
            method: "Elem",
            kind: Kind::Int,
        };
        assert_eq!(format!("{err}"), "rtti: call of Elem on int type");
    }

    #[test]
    fn test_store_error_messages() {
        assert_eq!(
            format!("{}", StoreError::UnsupportedWordSize(3)),
            "unsupported word size 3"
        );
        assert_eq!(format!("{}", StoreError::BadMagic), "bad descriptor store magic");
    }
}
