//! Type descriptor validation.
//!
//! A [`SimpleType`] is either inline (basic tag in the high bits, low 24 bits
//! zero) or an offset to a complex type blob. Complex blobs can reference
//! further types - array elements, container parameters - so validation
//! recurses with a depth cap to stop reference cycles crafted into a buffer.

use crate::{
    file::io::read_ne,
    schema::{
        header::HEADER_SIZE,
        types::{
            ArrayTypeBlob, ErrorTypeBlob, InterfaceTypeBlob, ParamTypeBlob, SimpleType, TypeTag,
        },
    },
    Error, Result,
};

use super::Validator;

/// Deepest legitimate type nesting; anything beyond is a crafted cycle.
const MAX_TYPE_DEPTH: usize = 16;

impl Validator<'_> {
    /// Validate a type descriptor and everything it references.
    pub(crate) fn check_type(&mut self, descriptor: SimpleType) -> Result<()> {
        self.check_type_at_depth(descriptor, 0)
    }

    fn check_type_at_depth(&mut self, descriptor: SimpleType, depth: usize) -> Result<()> {
        if depth > MAX_TYPE_DEPTH {
            return Err(malformed_error!(
                "{}: type nesting exceeds {} levels",
                self.path(),
                MAX_TYPE_DEPTH
            ));
        }

        if descriptor.is_inline() {
            return self.check_inline(descriptor);
        }

        let offset = descriptor.0;
        if offset % 4 != 0 {
            return Err(Error::MisalignedOffset(offset));
        }
        let offset = offset as usize;
        if offset < HEADER_SIZE || offset >= self.data.len() {
            return Err(malformed_error!(
                "{}: type blob offset 0x{:x} is outside the buffer body",
                self.path(),
                offset
            ));
        }

        let (_, tag) = crate::schema::types::complex_type_header(read_ne::<u8>(self.data, offset)?);
        match tag {
            Some(TypeTag::Array) => self.check_array(offset, depth),
            Some(TypeTag::Interface) => self.check_interface_reference(offset),
            Some(TypeTag::List) | Some(TypeTag::SList) => self.check_params(offset, 1, depth),
            Some(TypeTag::Hash) => self.check_params(offset, 2, depth),
            Some(TypeTag::Error) => self.check_error(offset),
            Some(basic) => Err(malformed_error!(
                "{}: basic tag {} stored in offset form",
                self.path(),
                basic
            )),
            None => Err(malformed_error!(
                "{}: undefined type tag in complex blob at 0x{:x}",
                self.path(),
                offset
            )),
        }
    }

    fn check_inline(&self, descriptor: SimpleType) -> Result<()> {
        let Some(tag) = descriptor.inline_tag() else {
            return Err(malformed_error!(
                "{}: undefined inline type tag in descriptor 0x{:08x}",
                self.path(),
                descriptor.0
            ));
        };

        if !tag.is_basic() {
            return Err(malformed_error!(
                "{}: non-basic tag {} encoded inline",
                self.path(),
                tag
            ));
        }
        if tag.is_basic_pointer() && !descriptor.is_pointer() {
            return Err(malformed_error!(
                "{}: {} is a pointer type but the pointer flag is clear",
                self.path(),
                tag
            ));
        }

        Ok(())
    }

    fn check_array(&mut self, offset: usize, depth: usize) -> Result<()> {
        let blob = ArrayTypeBlob::read(self.data, offset)?;

        if blob.array_kind.is_none() {
            return Err(malformed_error!(
                "{}: undefined array kind at 0x{:x}",
                self.path(),
                offset
            ));
        }
        if blob.has_length && blob.has_size {
            return Err(malformed_error!(
                "{}: array declares both a length argument and a fixed size",
                self.path()
            ));
        }

        self.check_type_at_depth(blob.element_type, depth + 1)
    }

    fn check_interface_reference(&self, offset: usize) -> Result<()> {
        let blob = InterfaceTypeBlob::read(self.data, offset)?;
        if blob.interface == 0 {
            return Err(malformed_error!(
                "{}: interface type references directory index 0 (indices are 1-based)",
                self.path()
            ));
        }
        self.check_entry_index(blob.interface)
    }

    fn check_params(&mut self, offset: usize, arity: u16, depth: usize) -> Result<()> {
        let blob = ParamTypeBlob::read(self.data, offset)?;
        if blob.n_types != arity {
            return Err(malformed_error!(
                "{}: container at 0x{:x} declares {} type parameters, expected {}",
                self.path(),
                offset,
                blob.n_types,
                arity
            ));
        }

        for index in 0..usize::from(arity) {
            let param = SimpleType::read(self.data, ParamTypeBlob::param_offset(offset, index))?;
            self.check_type_at_depth(param, depth + 1)?;
        }
        Ok(())
    }

    fn check_error(&self, offset: usize) -> Result<()> {
        let blob = ErrorTypeBlob::read(self.data, offset)?;
        if blob.n_domains != 0 {
            return Err(malformed_error!(
                "{}: error type declares {} domains, must be 0",
                self.path(),
                blob.n_domains
            ));
        }
        Ok(())
    }
}
