//! Per-kind entity blob validation.
//!
//! Each check reads the blob through [`crate::schema`], verifies its own tag
//! against the directory's, checks every name and type it references, and
//! recurses into trailing arrays via [`crate::schema::layout`]. Container
//! checks push their entity name onto the context stack so nested defects
//! report a full path.

use crate::{
    schema::{
        blobs::{
            ArgBlob, CallbackBlob, ConstantBlob, EnumBlob, FieldBlob, FieldFlags, FunctionBlob,
            InterfaceBlob, ObjectBlob, PropertyBlob, SignalBlob, SignalFlags, SignatureBlob,
            StructBlob, UnionBlob, VFuncBlob, ValueBlob,
        },
        header::HEADER_SIZE,
        layout::{self, EnumLayout, InterfaceLayout, ObjectLayout, StructLayout, UnionLayout},
        BlobType, DirEntry, TypeTag,
    },
    Error, Result,
};

use super::Validator;

impl Validator<'_> {
    /// Validate the local directory entry blob at `offset`.
    pub(crate) fn check_entry_blob(
        &mut self,
        blob_type: BlobType,
        name: &str,
        offset: usize,
    ) -> Result<()> {
        self.push_context(format!("{blob_type} {name}"));
        let result = match blob_type {
            BlobType::Function => self.check_function(offset, blob_type),
            BlobType::Callback => self.check_callback_blob(offset),
            BlobType::Struct | BlobType::Boxed => self.check_struct(offset, blob_type),
            BlobType::Enum | BlobType::Flags => self.check_enum(offset, blob_type),
            BlobType::Object => self.check_object(offset),
            BlobType::Interface => self.check_interface(offset),
            BlobType::Constant => self.check_constant(offset),
            BlobType::Union => self.check_union(offset),
            BlobType::Invalid | BlobType::Invalid0 => {
                Err(malformed_error!("{}: reserved blob type tag", self.path()))
            }
        };
        self.pop_context();
        result
    }

    fn check_tag(&self, declared: u16, expected: BlobType) -> Result<()> {
        if declared != expected as u16 {
            return Err(malformed_error!(
                "{}: blob carries tag {} but the directory declares {}",
                self.path(),
                declared,
                expected as u16
            ));
        }
        Ok(())
    }

    fn check_function(&mut self, offset: usize, expected: BlobType) -> Result<()> {
        let blob = FunctionBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, expected)?;
        self.check_name(blob.name)?;
        self.check_name(blob.symbol)?;

        if blob.is_setter() && blob.is_getter() {
            return Err(malformed_error!(
                "{}: function marked as both setter and getter",
                self.path()
            ));
        }

        self.check_signature(blob.signature)
    }

    fn check_callback_blob(&mut self, offset: usize) -> Result<()> {
        let blob = CallbackBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, BlobType::Callback)?;
        self.check_name(blob.name)?;
        self.check_signature(blob.signature)
    }

    fn check_signature(&mut self, signature: u32) -> Result<()> {
        if signature % 4 != 0 {
            return Err(Error::MisalignedOffset(signature));
        }
        let offset = signature as usize;
        if offset < HEADER_SIZE {
            return Err(malformed_error!(
                "{}: signature offset 0x{:x} points into the header",
                self.path(),
                signature
            ));
        }

        let blob = SignatureBlob::read(self.data, offset)?;
        if layout::signature_end(offset, usize::from(blob.n_arguments)) > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        self.check_type(blob.return_type)?;

        for index in 0..usize::from(blob.n_arguments) {
            let arg = ArgBlob::read(self.data, SignatureBlob::arg_offset(offset, index))?;
            let name = self.check_name(arg.name)?.to_string();

            self.push_context(format!("arg {name}"));
            let result = self.check_type(arg.arg_type);
            self.pop_context();
            result?;
        }

        Ok(())
    }

    fn check_constant(&mut self, offset: usize) -> Result<()> {
        let blob = ConstantBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, BlobType::Constant)?;
        self.check_name(blob.name)?;
        self.check_type(blob.const_type)?;

        let end = (blob.offset as usize)
            .checked_add(blob.size as usize)
            .ok_or(Error::OutOfBounds)?;
        if end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        match blob.const_type.inline_tag() {
            Some(tag) => {
                if let Some(expected) = scalar_size(tag) {
                    if blob.size as usize != expected {
                        return Err(Error::SizeMismatch {
                            context: "constant literal",
                            declared: blob.size as usize,
                            actual: expected,
                        });
                    }
                } else if tag.is_basic_pointer() {
                    // string literal: size covers the bytes plus the terminator
                    if blob.size == 0 || self.data[end - 1] != 0 {
                        return Err(malformed_error!(
                            "{}: string constant is not NUL-terminated",
                            self.path()
                        ));
                    }
                }
            }
            None => {
                return Err(malformed_error!(
                    "{}: constants must carry an inline basic type",
                    self.path()
                ));
            }
        }

        Ok(())
    }

    fn check_enum(&mut self, offset: usize, expected: BlobType) -> Result<()> {
        let blob = EnumBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, expected)?;
        self.check_name(blob.name)?;
        self.check_optional_name(blob.gtype_name)?;
        self.check_optional_name(blob.gtype_init)?;
        self.check_optional_name(blob.error_domain)?;

        match blob.storage_type() {
            Some(tag) if is_integral(tag) => {}
            _ => {
                return Err(malformed_error!(
                    "{}: enum storage type is not an integral tag",
                    self.path()
                ));
            }
        }

        let sections = EnumLayout::compute(offset, &blob);
        if sections.end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        for index in 0..usize::from(blob.n_values) {
            let value = ValueBlob::read(self.data, sections.values + index * ValueBlob::SIZE)?;
            self.check_name(value.name)?;
        }
        self.check_methods(sections.methods, usize::from(blob.n_methods))
    }

    fn check_struct(&mut self, offset: usize, expected: BlobType) -> Result<()> {
        let blob = StructBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, expected)?;
        self.check_name(blob.name)?;
        self.check_optional_name(blob.gtype_name)?;
        self.check_optional_name(blob.gtype_init)?;
        self.check_optional_name(blob.copy_func)?;
        self.check_optional_name(blob.free_func)?;

        let sections = StructLayout::compute(self.data, offset, &blob)?;
        if sections.end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        self.check_fields(sections.fields, usize::from(blob.n_fields))?;
        self.check_methods(sections.methods, usize::from(blob.n_methods))
    }

    fn check_object(&mut self, offset: usize) -> Result<()> {
        let blob = ObjectBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, BlobType::Object)?;
        self.check_name(blob.name)?;
        self.check_name(blob.gtype_name)?;
        self.check_name(blob.gtype_init)?;
        self.check_optional_name(blob.ref_func)?;
        self.check_optional_name(blob.unref_func)?;
        self.check_optional_name(blob.set_value_func)?;
        self.check_optional_name(blob.get_value_func)?;
        self.check_entry_kind(blob.parent, &[BlobType::Object], "parent")?;
        self.check_entry_kind(blob.gtype_struct, &[BlobType::Struct], "class struct")?;

        let sections = ObjectLayout::compute(self.data, offset, &blob)?;
        if sections.end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        for index in 0..usize::from(blob.n_interfaces) {
            let entry =
                crate::file::io::read_ne::<u16>(self.data, sections.interfaces + index * 2)?;
            if entry == 0 {
                return Err(malformed_error!(
                    "{}: implemented-interface index 0 (indices are 1-based)",
                    self.path()
                ));
            }
            self.check_entry_kind(entry, &[BlobType::Interface], "implemented interface")?;
        }

        self.check_fields(sections.fields, usize::from(blob.n_fields))?;
        self.check_properties(sections.properties, usize::from(blob.n_properties))?;
        self.check_methods(sections.methods, usize::from(blob.n_methods))?;
        self.check_signals(sections.signals, usize::from(blob.n_signals), blob.n_vfuncs)?;
        self.check_vfuncs(sections.vfuncs, usize::from(blob.n_vfuncs), blob.n_methods)?;
        self.check_constants(sections.constants, usize::from(blob.n_constants))
    }

    fn check_interface(&mut self, offset: usize) -> Result<()> {
        let blob = InterfaceBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, BlobType::Interface)?;
        self.check_name(blob.name)?;
        self.check_name(blob.gtype_name)?;
        self.check_name(blob.gtype_init)?;
        self.check_entry_kind(blob.gtype_struct, &[BlobType::Struct], "interface struct")?;

        let sections = InterfaceLayout::compute(offset, &blob);
        if sections.end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        for index in 0..usize::from(blob.n_prerequisites) {
            let entry =
                crate::file::io::read_ne::<u16>(self.data, sections.prerequisites + index * 2)?;
            if entry == 0 {
                return Err(malformed_error!(
                    "{}: prerequisite index 0 (indices are 1-based)",
                    self.path()
                ));
            }
            self.check_entry_kind(
                entry,
                &[BlobType::Object, BlobType::Interface],
                "prerequisite",
            )?;
        }

        self.check_properties(sections.properties, usize::from(blob.n_properties))?;
        self.check_methods(sections.methods, usize::from(blob.n_methods))?;
        self.check_signals(sections.signals, usize::from(blob.n_signals), blob.n_vfuncs)?;
        self.check_vfuncs(sections.vfuncs, usize::from(blob.n_vfuncs), blob.n_methods)?;
        self.check_constants(sections.constants, usize::from(blob.n_constants))
    }

    fn check_union(&mut self, offset: usize) -> Result<()> {
        let blob = UnionBlob::read(self.data, offset)?;
        self.check_tag(blob.blob_type, BlobType::Union)?;
        self.check_name(blob.name)?;
        self.check_optional_name(blob.gtype_name)?;
        self.check_optional_name(blob.gtype_init)?;
        self.check_optional_name(blob.copy_func)?;
        self.check_optional_name(blob.free_func)?;

        let sections = UnionLayout::compute(self.data, offset, &blob)?;
        if sections.end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        self.check_fields(sections.fields, usize::from(blob.n_fields))?;
        self.check_methods(sections.functions, usize::from(blob.n_functions))?;

        if blob.is_discriminated() {
            self.check_type(blob.discriminator_type)?;
            self.check_constants(sections.discriminators, usize::from(blob.n_fields))?;
        }

        Ok(())
    }

    fn check_fields(&mut self, section: usize, count: usize) -> Result<()> {
        let mut pos = section;
        for _ in 0..count {
            let field = FieldBlob::read(self.data, pos)?;
            let name = self.check_name(field.name)?.to_string();

            self.push_context(format!("field {name}"));
            let result = if field.flags.contains(FieldFlags::HAS_EMBEDDED_TYPE) {
                self.check_callback_blob(pos + FieldBlob::SIZE)
            } else {
                self.check_type(field.field_type)
            };
            self.pop_context();
            result?;

            pos += field.effective_size();
        }
        Ok(())
    }

    fn check_methods(&mut self, section: usize, count: usize) -> Result<()> {
        for index in 0..count {
            let offset = section + index * FunctionBlob::SIZE;
            let blob = FunctionBlob::read(self.data, offset)?;
            let name = self.check_name(blob.name)?.to_string();

            self.push_context(format!("method {name}"));
            let result = self.check_function(offset, BlobType::Function);
            self.pop_context();
            result?;
        }
        Ok(())
    }

    fn check_properties(&mut self, section: usize, count: usize) -> Result<()> {
        for index in 0..count {
            let blob = PropertyBlob::read(self.data, section + index * PropertyBlob::SIZE)?;
            let name = self.check_name(blob.name)?.to_string();

            self.push_context(format!("property {name}"));
            let result = self.check_type(blob.prop_type);
            self.pop_context();
            result?;
        }
        Ok(())
    }

    fn check_signals(&mut self, section: usize, count: usize, n_vfuncs: u16) -> Result<()> {
        for index in 0..count {
            let blob = SignalBlob::read(self.data, section + index * SignalBlob::SIZE)?;
            let name = self.check_name(blob.name)?.to_string();

            self.push_context(format!("signal {name}"));
            let result = (|| {
                if blob.flags.contains(SignalFlags::HAS_CLASS_CLOSURE)
                    && blob.class_closure >= n_vfuncs
                {
                    return Err(malformed_error!(
                        "{}: class closure index {} exceeds the vfunc count {}",
                        self.path(),
                        blob.class_closure,
                        n_vfuncs
                    ));
                }
                self.check_signature(blob.signature)
            })();
            self.pop_context();
            result?;
        }
        Ok(())
    }

    fn check_vfuncs(&mut self, section: usize, count: usize, n_methods: u16) -> Result<()> {
        for index in 0..count {
            let blob = VFuncBlob::read(self.data, section + index * VFuncBlob::SIZE)?;
            let name = self.check_name(blob.name)?.to_string();

            self.push_context(format!("vfunc {name}"));
            let result = (|| {
                // invoker is 1-based, 0 means none
                if blob.invoker > n_methods {
                    return Err(malformed_error!(
                        "{}: invoker index {} exceeds the method count {}",
                        self.path(),
                        blob.invoker,
                        n_methods
                    ));
                }
                self.check_signature(blob.signature)
            })();
            self.pop_context();
            result?;
        }
        Ok(())
    }

    fn check_constants(&mut self, section: usize, count: usize) -> Result<()> {
        for index in 0..count {
            let offset = section + index * ConstantBlob::SIZE;
            let blob = ConstantBlob::read(self.data, offset)?;
            let name = self.check_name(blob.name)?.to_string();

            self.push_context(format!("constant {name}"));
            let result = self.check_constant(offset);
            self.pop_context();
            result?;
        }
        Ok(())
    }

    fn check_optional_name(&self, offset: u32) -> Result<()> {
        if offset != 0 {
            self.check_name(offset)?;
        }
        Ok(())
    }

    /// Directory indices inside blobs are 1-based; 0 means "none".
    pub(crate) fn check_entry_index(&self, index: u16) -> Result<()> {
        if index > self.header.n_entries {
            return Err(malformed_error!(
                "{}: directory index {} exceeds the entry count {}",
                self.path(),
                index,
                self.header.n_entries
            ));
        }
        Ok(())
    }

    /// A directory reference must land on an entry of a compatible kind: an
    /// object's parent must be an Object, a prerequisite an Object or
    /// Interface, and so on. Index 0 still means "none".
    fn check_entry_kind(&self, index: u16, allowed: &[BlobType], what: &str) -> Result<()> {
        self.check_entry_index(index)?;
        if index == 0 {
            return Ok(());
        }

        let entry = DirEntry::read(
            self.data,
            self.header.directory as usize + usize::from(index - 1) * DirEntry::SIZE,
        )?;
        let kind = BlobType::from_repr(entry.blob_type);
        if !kind.is_some_and(|kind| allowed.contains(&kind)) {
            return Err(malformed_error!(
                "{}: {} references directory entry {} of kind tag {}, expected {:?}",
                self.path(),
                what,
                index,
                entry.blob_type,
                allowed
            ));
        }
        Ok(())
    }
}

/// Byte size of fixed-size scalar constant literals.
fn scalar_size(tag: TypeTag) -> Option<usize> {
    match tag {
        TypeTag::Int8 | TypeTag::UInt8 => Some(1),
        TypeTag::Int16 | TypeTag::UInt16 => Some(2),
        TypeTag::Boolean
        | TypeTag::Int32
        | TypeTag::UInt32
        | TypeTag::Float
        | TypeTag::UniChar => Some(4),
        TypeTag::Int64 | TypeTag::UInt64 | TypeTag::Double => Some(8),
        _ => None,
    }
}

/// Tags an enum may use as its storage representation.
fn is_integral(tag: TypeTag) -> bool {
    matches!(
        tag,
        TypeTag::Int8
            | TypeTag::UInt8
            | TypeTag::Int16
            | TypeTag::UInt16
            | TypeTag::Int32
            | TypeTag::UInt32
            | TypeTag::Int64
            | TypeTag::UInt64
    )
}
