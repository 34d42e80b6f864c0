//! Binary schema of the typelib format.
//!
//! This module is pure layout: one parsed-view struct per blob kind, each with
//! a `SIZE` constant and a bounds-checked `read` that performs exactly the
//! field reads the format defines. There is no trust decision here - the
//! [`crate::validate`] module decides whether a buffer may be read at all, and
//! the [`crate::info`] layer exposes the same structs to consumers afterwards.
//!
//! # Architecture
//!
//! Two independent consumers (validator and accessor layer) walk the same
//! variable-layout records. Any divergence in their offset arithmetic is a
//! correctness bug, so everything that computes a position inside a blob lives
//! in one place:
//!
//! - [`crate::schema::layout`] - Trailing-array arithmetic (Nth field, Nth
//!   method, even-padded index arrays, embedded callbacks)
//! - [`crate::schema::header::Header`] - The fixed 112-byte header
//! - [`crate::schema::directory::DirEntry`] - 12-byte, 1-indexed directory records
//! - [`crate::schema::blobs`] - Entity blob layouts
//! - [`crate::schema::types`] - Type descriptor encoding
//!
//! # Format Fingerprint
//!
//! The header declares the byte size of every fixed-size blob kind. A
//! validator compares each declared size against the `SIZE` constants defined
//! here; a mismatch means the buffer was produced by an incompatible
//! implementation and is rejected outright.

pub mod blobs;
pub mod directory;
pub mod header;
pub mod layout;
pub mod types;

pub use blobs::*;
pub use directory::DirEntry;
pub use header::{BlobSizes, Header};
pub use types::{ArrayKind, SimpleType, TypeTag};

use strum::{Display, FromRepr};

/// The 16-byte magic sequence every typelib starts with.
pub const TYPELIB_MAGIC: &[u8; 16] = b"TLIB\nMETADATA\r\n\x1a";

/// Major format version this implementation reads. Major versions must match exactly.
pub const MAJOR_VERSION: u8 = 4;

/// Minor format version this implementation writes/understands. Buffers with a
/// higher minor version are still accepted (forward-compatible minor parsing).
pub const MINOR_VERSION: u8 = 0;

/// Upper bound on name string length, terminator included.
pub const MAX_NAME_LEN: usize = 1024;

/// Section identifier for the embedded perfect-hash directory index.
pub const SECTION_DIRECTORY_INDEX: u32 = 1;

/// Blob type tag carried by directory entries and top-level blobs.
///
/// `Boxed` shares the struct layout with `Struct`, and `Flags` shares the
/// layout with `Enum`; the distinct tags preserve the semantic difference for
/// consumers generating bindings.
#[derive(Clone, Copy, Debug, Display, FromRepr, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum BlobType {
    /// Reserved invalid tag
    Invalid = 0,
    /// Top-level callable
    Function = 1,
    /// Function pointer type
    Callback = 2,
    /// Plain aggregate
    Struct = 3,
    /// Aggregate with registered copy/free semantics
    Boxed = 4,
    /// Enumeration
    Enum = 5,
    /// Bitfield enumeration
    Flags = 6,
    /// Classed instance type
    Object = 7,
    /// Abstract contract type
    Interface = 8,
    /// Typed constant value
    Constant = 9,
    /// Reserved invalid tag
    Invalid0 = 10,
    /// Overlapping aggregate
    Union = 11,
}

impl BlobType {
    /// Decode a raw directory/blob tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for tags outside the defined range or
    /// one of the two reserved invalid tags.
    pub fn parse(raw: u16) -> crate::Result<BlobType> {
        match BlobType::from_repr(raw) {
            Some(BlobType::Invalid) | Some(BlobType::Invalid0) | None => {
                Err(malformed_error!("Invalid blob type tag - {}", raw))
            }
            Some(blob_type) => Ok(blob_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_is_sixteen_bytes() {
        assert_eq!(TYPELIB_MAGIC.len(), 16);
    }

    #[test]
    fn blob_type_parse() {
        assert_eq!(BlobType::parse(1).unwrap(), BlobType::Function);
        assert_eq!(BlobType::parse(11).unwrap(), BlobType::Union);
        assert!(BlobType::parse(0).is_err());
        assert!(BlobType::parse(10).is_err());
        assert!(BlobType::parse(12).is_err());
        assert!(BlobType::parse(u16::MAX).is_err());
    }
}
