//! Type descriptor encoding.
//!
//! Everywhere the format needs "a type" it stores a 4-byte [`SimpleType`].
//! Basic types (integers, floats, strings, ...) are encoded inline; anything
//! structured (arrays, interface references, containers, error types) is
//! stored by offset to a complex type blob whose own tag selects the layout.
//!
//! Inline form: the low 24 bits are zero, bit 24 is the pointer flag and bits
//! 27-31 hold the tag. Since every valid blob offset is at least the header
//! size (and thus has nonzero low bits), the two forms cannot collide.

use strum::{Display, FromRepr};

use crate::{
    file::io::{read_ne, read_ne_at},
    Result,
};

/// Type tag for both inline simple types and complex type blobs.
#[derive(Clone, Copy, Debug, Display, FromRepr, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    /// No value
    Void = 0,
    /// Boolean
    Boolean = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 8-bit integer
    UInt8 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 16-bit integer
    UInt16 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 32-bit integer
    UInt32 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// Unsigned 64-bit integer
    UInt64 = 9,
    /// 32-bit float
    Float = 10,
    /// 64-bit float
    Double = 11,
    /// Runtime type identity value
    GType = 12,
    /// UTF-8 string
    Utf8 = 13,
    /// Filesystem path string
    Filename = 14,
    /// Array (complex)
    Array = 15,
    /// Reference to a directory entry (complex)
    Interface = 16,
    /// Doubly-linked list container (complex)
    List = 17,
    /// Singly-linked list container (complex)
    SList = 18,
    /// Hash table container (complex)
    Hash = 19,
    /// Error type (complex)
    Error = 20,
    /// Unicode code point
    UniChar = 21,
}

impl TypeTag {
    /// A basic tag may be encoded inline in a [`SimpleType`].
    ///
    /// Everything below [`TypeTag::Array`] is basic, plus the single scalar
    /// exception [`TypeTag::UniChar`].
    pub fn is_basic(self) -> bool {
        (self as u8) < (TypeTag::Array as u8) || self == TypeTag::UniChar
    }

    /// Basic tags that are nonetheless pointers and must carry the pointer flag.
    pub fn is_basic_pointer(self) -> bool {
        matches!(self, TypeTag::Utf8 | TypeTag::Filename)
    }
}

/// The 4-byte type descriptor: inline basic type or offset to a complex type blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimpleType(pub u32);

impl SimpleType {
    /// Size of the descriptor in the buffer.
    pub const SIZE: usize = 4;

    const INLINE_MASK: u32 = 0x00FF_FFFF;

    /// Build an inline descriptor. Used by the test builder; the reading side
    /// only ever decodes.
    pub fn inline(tag: TypeTag, pointer: bool) -> SimpleType {
        SimpleType(((tag as u32) << 27) | (u32::from(pointer) << 24))
    }

    /// Build an offset descriptor pointing at a complex type blob.
    pub fn by_offset(offset: u32) -> SimpleType {
        SimpleType(offset)
    }

    /// Read the descriptor at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if 4 bytes are not available.
    pub fn read(data: &[u8], offset: usize) -> Result<SimpleType> {
        Ok(SimpleType(read_ne::<u32>(data, offset)?))
    }

    /// Whether this is the inline form.
    pub fn is_inline(&self) -> bool {
        self.0 & Self::INLINE_MASK == 0
    }

    /// The inline tag, if this is the inline form and the tag decodes.
    pub fn inline_tag(&self) -> Option<TypeTag> {
        if !self.is_inline() {
            return None;
        }

        TypeTag::from_repr(((self.0 >> 27) & 0x1F) as u8)
    }

    /// The inline pointer flag. Meaningless for the offset form.
    pub fn is_pointer(&self) -> bool {
        self.0 >> 24 & 1 != 0
    }

    /// The blob offset, if this is the offset form.
    pub fn offset(&self) -> Option<u32> {
        if self.is_inline() {
            None
        } else {
            Some(self.0)
        }
    }
}

/// Decode the shared first byte of every complex type blob:
/// bit 0 = pointer, bits 1-2 reserved, bits 3-7 = tag.
pub fn complex_type_header(byte: u8) -> (bool, Option<TypeTag>) {
    (byte & 1 != 0, TypeTag::from_repr(byte >> 3))
}

/// Encode the shared complex-blob header byte (builder side).
pub fn encode_complex_type_header(tag: TypeTag, pointer: bool) -> u8 {
    ((tag as u8) << 3) | u8::from(pointer)
}

/// Storage strategy of an array type.
#[derive(Clone, Copy, Debug, Display, FromRepr, PartialEq, Eq)]
#[repr(u8)]
pub enum ArrayKind {
    /// Plain C array
    C = 0,
    /// Growable array container
    Array = 1,
    /// Pointer array container
    PtrArray = 2,
    /// Byte array container
    ByteArray = 3,
}

/// Complex type blob for arrays: 8 bytes, element type inline.
#[derive(Clone, Copy, Debug)]
pub struct ArrayTypeBlob {
    /// Pointer flag from the shared header bits
    pub pointer: bool,
    /// Raw tag from the shared header bits (must be [`TypeTag::Array`])
    pub tag: Option<TypeTag>,
    /// Array is terminated by a zero element
    pub zero_terminated: bool,
    /// `dimension` holds the index of the length argument
    pub has_length: bool,
    /// `dimension` holds a fixed element count
    pub has_size: bool,
    /// Storage strategy
    pub array_kind: Option<ArrayKind>,
    /// Length-argument index or fixed size, depending on the flags
    pub dimension: u16,
    /// Element type
    pub element_type: SimpleType,
}

impl ArrayTypeBlob {
    /// Size of the array type blob.
    pub const SIZE: usize = 8;

    /// Read the array type blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ArrayTypeBlob> {
        let mut pos = offset;
        let bits = read_ne_at::<u16>(data, &mut pos)?;
        let dimension = read_ne_at::<u16>(data, &mut pos)?;
        let element_type = SimpleType::read(data, pos)?;

        Ok(ArrayTypeBlob {
            pointer: bits & 1 != 0,
            tag: TypeTag::from_repr(((bits >> 3) & 0x1F) as u8),
            zero_terminated: bits & (1 << 8) != 0,
            has_length: bits & (1 << 9) != 0,
            has_size: bits & (1 << 10) != 0,
            array_kind: ArrayKind::from_repr(((bits >> 11) & 0x3) as u8),
            dimension,
            element_type,
        })
    }
}

/// Complex type blob referencing a directory entry: 4 bytes.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceTypeBlob {
    /// Pointer flag
    pub pointer: bool,
    /// Raw tag (must be [`TypeTag::Interface`])
    pub tag: Option<TypeTag>,
    /// 1-based directory index of the referenced entry
    pub interface: u16,
}

impl InterfaceTypeBlob {
    /// Size of the interface type blob.
    pub const SIZE: usize = 4;

    /// Read the interface type blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<InterfaceTypeBlob> {
        let (pointer, tag) = complex_type_header(read_ne::<u8>(data, offset)?);

        Ok(InterfaceTypeBlob {
            pointer,
            tag,
            interface: read_ne::<u16>(data, offset + 2)?,
        })
    }
}

/// Complex type blob for parameterized containers (list/slist/hash):
/// 4 bytes plus one inline [`SimpleType`] per type parameter.
///
/// Lists carry exactly one parameter, hashes exactly two.
#[derive(Clone, Copy, Debug)]
pub struct ParamTypeBlob {
    /// Pointer flag
    pub pointer: bool,
    /// Raw tag ([`TypeTag::List`], [`TypeTag::SList`] or [`TypeTag::Hash`])
    pub tag: Option<TypeTag>,
    /// Number of trailing type parameters
    pub n_types: u16,
}

impl ParamTypeBlob {
    /// Size of the fixed prefix; type parameters follow.
    pub const SIZE: usize = 4;

    /// Read the param type blob prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ParamTypeBlob> {
        let (pointer, tag) = complex_type_header(read_ne::<u8>(data, offset)?);

        Ok(ParamTypeBlob {
            pointer,
            tag,
            n_types: read_ne::<u16>(data, offset + 2)?,
        })
    }

    /// Offset of the Nth type parameter. Shared by validator and accessors.
    pub fn param_offset(blob_offset: usize, n: usize) -> usize {
        blob_offset + Self::SIZE + n * SimpleType::SIZE
    }
}

/// Complex type blob for error types: 4 bytes.
///
/// `n_domains` is a leftover of an older revision and must be 0.
#[derive(Clone, Copy, Debug)]
pub struct ErrorTypeBlob {
    /// Pointer flag
    pub pointer: bool,
    /// Raw tag (must be [`TypeTag::Error`])
    pub tag: Option<TypeTag>,
    /// Must be 0
    pub n_domains: u16,
}

impl ErrorTypeBlob {
    /// Size of the error type blob.
    pub const SIZE: usize = 4;

    /// Read the error type blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ErrorTypeBlob> {
        let (pointer, tag) = complex_type_header(read_ne::<u8>(data, offset)?);

        Ok(ErrorTypeBlob {
            pointer,
            tag,
            n_domains: read_ne::<u16>(data, offset + 2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_roundtrip() {
        let st = SimpleType::inline(TypeTag::Int32, false);
        assert!(st.is_inline());
        assert_eq!(st.inline_tag(), Some(TypeTag::Int32));
        assert!(!st.is_pointer());

        let st = SimpleType::inline(TypeTag::Utf8, true);
        assert_eq!(st.inline_tag(), Some(TypeTag::Utf8));
        assert!(st.is_pointer());
    }

    #[test]
    fn offset_form() {
        let st = SimpleType::by_offset(0x1234);
        assert!(!st.is_inline());
        assert_eq!(st.offset(), Some(0x1234));
        assert_eq!(st.inline_tag(), None);
    }

    #[test]
    fn basic_tags() {
        assert!(TypeTag::Void.is_basic());
        assert!(TypeTag::Utf8.is_basic());
        assert!(TypeTag::UniChar.is_basic());
        assert!(!TypeTag::Array.is_basic());
        assert!(!TypeTag::Hash.is_basic());
        assert!(!TypeTag::Error.is_basic());
    }

    #[test]
    fn crafted_array_blob() {
        let mut data = Vec::new();
        // pointer=0, tag=Array(15), zero_terminated=1, has_length=1, kind=C
        let bits: u16 = (15 << 3) | (1 << 8) | (1 << 9);
        data.extend_from_slice(&bits.to_ne_bytes());
        data.extend_from_slice(&2u16.to_ne_bytes()); // dimension: length arg index
        data.extend_from_slice(&SimpleType::inline(TypeTag::UInt8, false).0.to_ne_bytes());

        let array = ArrayTypeBlob::read(&data, 0).unwrap();
        assert_eq!(array.tag, Some(TypeTag::Array));
        assert!(array.zero_terminated);
        assert!(array.has_length);
        assert!(!array.has_size);
        assert_eq!(array.array_kind, Some(ArrayKind::C));
        assert_eq!(array.dimension, 2);
        assert_eq!(array.element_type.inline_tag(), Some(TypeTag::UInt8));
    }

    #[test]
    fn crafted_interface_blob() {
        let mut data = Vec::new();
        data.push(encode_complex_type_header(TypeTag::Interface, true));
        data.push(0);
        data.extend_from_slice(&3u16.to_ne_bytes());

        let iface = InterfaceTypeBlob::read(&data, 0).unwrap();
        assert!(iface.pointer);
        assert_eq!(iface.tag, Some(TypeTag::Interface));
        assert_eq!(iface.interface, 3);
    }

    #[test]
    fn param_offsets() {
        assert_eq!(ParamTypeBlob::param_offset(100, 0), 104);
        assert_eq!(ParamTypeBlob::param_offset(100, 1), 108);
    }
}
