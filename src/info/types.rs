//! Type descriptor accessor.

use crate::{
    schema::types::{
        complex_type_header, ArrayKind, ArrayTypeBlob, ErrorTypeBlob, InterfaceTypeBlob,
        ParamTypeBlob, SimpleType, TypeTag,
    },
    Error, Result,
};

use super::{Info, InfoCore};

/// A view of one type descriptor: the 4-byte [`SimpleType`] at the info's
/// offset, plus the complex type blob it may point at.
///
/// On a validated buffer every descriptor decodes, so the scalar accessors
/// are infallible; only directory resolution ([`TypeInfo::interface`]) and
/// parameter indexing can fail.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeInfo {
    pub(crate) core: InfoCore,
}

impl TypeInfo {
    pub(crate) fn new(core: InfoCore) -> TypeInfo {
        TypeInfo { core }
    }

    fn descriptor(&self) -> SimpleType {
        SimpleType::read(self.core.data(), self.core.offset).unwrap_or(SimpleType(0))
    }

    /// Offset of the complex type blob, for the offset form.
    fn blob_offset(&self) -> Option<usize> {
        self.descriptor().offset().map(|offset| offset as usize)
    }

    /// The type tag, from the inline descriptor or the referenced blob.
    pub fn tag(&self) -> TypeTag {
        let descriptor = self.descriptor();
        if let Some(tag) = descriptor.inline_tag() {
            return tag;
        }

        self.blob_offset()
            .and_then(|offset| self.core.data().get(offset).copied())
            .and_then(|byte| complex_type_header(byte).1)
            .unwrap_or(TypeTag::Void)
    }

    /// Whether the value is passed by pointer.
    pub fn is_pointer(&self) -> bool {
        let descriptor = self.descriptor();
        if descriptor.is_inline() {
            return descriptor.is_pointer();
        }

        self.blob_offset()
            .and_then(|offset| self.core.data().get(offset).copied())
            .map(|byte| complex_type_header(byte).0)
            .unwrap_or(false)
    }

    /// Whether the tag is a basic (inline-encodable) type.
    pub fn is_basic(&self) -> bool {
        self.tag().is_basic()
    }

    fn array_blob(&self) -> Option<ArrayTypeBlob> {
        if self.tag() != TypeTag::Array {
            return None;
        }
        ArrayTypeBlob::read(self.core.data(), self.blob_offset()?).ok()
    }

    /// The storage strategy, for array types.
    pub fn array_kind(&self) -> Option<ArrayKind> {
        self.array_blob()?.array_kind
    }

    /// Whether the array is terminated by a zero element.
    pub fn is_zero_terminated(&self) -> bool {
        self.array_blob().is_some_and(|blob| blob.zero_terminated)
    }

    /// The fixed element count, for arrays that declare one.
    pub fn array_fixed_size(&self) -> Option<u16> {
        let blob = self.array_blob()?;
        blob.has_size.then_some(blob.dimension)
    }

    /// The index of the length argument, for arrays that declare one.
    pub fn array_length_index(&self) -> Option<u16> {
        let blob = self.array_blob()?;
        blob.has_length.then_some(blob.dimension)
    }

    /// The element type, for array types.
    pub fn element_type(&self) -> Option<TypeInfo> {
        if self.tag() != TypeTag::Array {
            return None;
        }
        // the element descriptor is the second word of the array blob
        Some(TypeInfo::new(self.core.at(self.blob_offset()? + 4)))
    }

    /// Number of container type parameters: 1 for lists, 2 for hashes,
    /// 0 otherwise.
    pub fn n_type_params(&self) -> usize {
        match self.tag() {
            TypeTag::List | TypeTag::SList => 1,
            TypeTag::Hash => 2,
            _ => 0,
        }
    }

    /// The Nth container type parameter.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`TypeInfo::n_type_params`].
    pub fn type_param(&self, index: usize) -> Result<TypeInfo> {
        let count = self.n_type_params();
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }

        let blob_offset = self.blob_offset().ok_or(Error::IndexOutOfRange {
            index,
            count: 0,
        })?;
        Ok(TypeInfo::new(
            self.core.at(ParamTypeBlob::param_offset(blob_offset, index)),
        ))
    }

    /// Resolve the referenced directory entry, for interface types.
    ///
    /// Returns `None` for any other tag. The resolved info may be
    /// [`Info::Unresolved`] when the defining namespace is not loaded.
    pub fn interface(&self) -> Option<Result<Info>> {
        if self.tag() != TypeTag::Interface {
            return None;
        }

        let blob = InterfaceTypeBlob::read(self.core.data(), self.blob_offset()?).ok()?;
        Some(self.core.resolve_entry(blob.interface))
    }

    /// Whether this is the error type.
    pub fn is_error(&self) -> bool {
        if self.tag() != TypeTag::Error {
            return false;
        }
        self.blob_offset()
            .and_then(|offset| ErrorTypeBlob::read(self.core.data(), offset).ok())
            .is_some()
    }
}
