//! Aggregate accessors: structs/boxed, enums/flags and unions.
//!
//! All child positions come from [`crate::schema::layout`], the same
//! arithmetic the validator ran, so a child lookup inside the declared count
//! cannot read out of bounds.

use crate::{
    schema::blobs::{
        ConstantBlob, EnumBlob, FunctionBlob, StructBlob, StructFlags, UnionBlob, UnionFlags,
        ValueBlob,
    },
    schema::layout::{self, EnumLayout, StructLayout, UnionLayout},
    schema::types::TypeTag,
    Error, Result,
};

use super::{ConstantInfo, FieldInfo, FunctionInfo, InfoCore, TypeInfo, ValueInfo};

/// A struct or boxed aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct StructInfo {
    pub(crate) core: InfoCore,
}

impl StructInfo {
    pub(crate) fn new(core: InfoCore) -> StructInfo {
        StructInfo { core }
    }

    fn blob(&self) -> StructBlob {
        StructBlob::read(self.core.data(), self.core.offset).unwrap_or(StructBlob {
            blob_type: 0,
            flags: StructFlags::empty(),
            name: 0,
            gtype_name: 0,
            gtype_init: 0,
            size: 0,
            n_fields: 0,
            n_methods: 0,
            copy_func: 0,
            free_func: 0,
        })
    }

    fn sections(&self) -> Result<StructLayout> {
        StructLayout::compute(self.core.data(), self.core.offset, &self.blob())
    }

    /// The struct name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The registered runtime type name, when one exists.
    pub fn runtime_type_name(&self) -> Option<&str> {
        let offset = self.blob().gtype_name;
        (offset != 0).then(|| self.core.string(offset))
    }

    /// Whether the struct is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(StructFlags::DEPRECATED)
    }

    /// Whether the struct is only ever referenced through a pointer.
    pub fn is_pointer(&self) -> bool {
        self.blob().flags.contains(StructFlags::POINTER)
    }

    /// Whether the struct is the class/iface struct of another entity.
    pub fn is_gtype_struct(&self) -> bool {
        self.blob().flags.contains(StructFlags::IS_GTYPE_STRUCT)
    }

    /// Size of the native struct in bytes; 0 for opaque structs.
    pub fn size(&self) -> u32 {
        self.blob().size
    }

    /// The copy function symbol, when declared.
    pub fn copy_function(&self) -> Option<&str> {
        let offset = self.blob().copy_func;
        (offset != 0).then(|| self.core.string(offset))
    }

    /// The free function symbol, when declared.
    pub fn free_function(&self) -> Option<&str> {
        let offset = self.blob().free_func;
        (offset != 0).then(|| self.core.string(offset))
    }

    /// Number of fields.
    pub fn n_fields(&self) -> usize {
        usize::from(self.blob().n_fields)
    }

    /// The Nth field.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`StructInfo::n_fields`].
    pub fn field(&self, index: usize) -> Result<FieldInfo> {
        let sections = self.sections()?;
        let offset = layout::nth_field(self.core.data(), sections.fields, self.n_fields(), index)?;
        Ok(FieldInfo::new(self.core.at(offset)))
    }

    /// Number of methods.
    pub fn n_methods(&self) -> usize {
        usize::from(self.blob().n_methods)
    }

    /// The Nth method.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`StructInfo::n_methods`].
    pub fn method(&self, index: usize) -> Result<FunctionInfo> {
        let sections = self.sections()?;
        let offset =
            layout::nth_fixed(sections.methods, FunctionBlob::SIZE, self.n_methods(), index)?;
        Ok(FunctionInfo::new(self.core.at(offset)))
    }

    /// Find a method by name.
    pub fn find_method(&self, name: &str) -> Option<FunctionInfo> {
        (0..self.n_methods())
            .filter_map(|index| self.method(index).ok())
            .find(|method| method.name() == name)
    }
}

/// An enum or flags type.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumInfo {
    pub(crate) core: InfoCore,
}

impl EnumInfo {
    pub(crate) fn new(core: InfoCore) -> EnumInfo {
        EnumInfo { core }
    }

    fn blob(&self) -> EnumBlob {
        EnumBlob::read(self.core.data(), self.core.offset).unwrap_or(EnumBlob {
            blob_type: 0,
            flags: 0,
            name: 0,
            gtype_name: 0,
            gtype_init: 0,
            n_values: 0,
            n_methods: 0,
            error_domain: 0,
        })
    }

    fn sections(&self) -> EnumLayout {
        EnumLayout::compute(self.core.offset, &self.blob())
    }

    /// The enum name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The registered runtime type name, when one exists.
    pub fn runtime_type_name(&self) -> Option<&str> {
        let offset = self.blob().gtype_name;
        (offset != 0).then(|| self.core.string(offset))
    }

    /// Whether the enum is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().is_deprecated()
    }

    /// The integer type the enum is stored as.
    pub fn storage_type(&self) -> TypeTag {
        self.blob().storage_type().unwrap_or(TypeTag::Int32)
    }

    /// The error domain string, for enums that model error codes.
    pub fn error_domain(&self) -> Option<&str> {
        let offset = self.blob().error_domain;
        (offset != 0).then(|| self.core.string(offset))
    }

    /// Number of values.
    pub fn n_values(&self) -> usize {
        usize::from(self.blob().n_values)
    }

    /// The Nth value.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`EnumInfo::n_values`].
    pub fn value(&self, index: usize) -> Result<ValueInfo> {
        let offset =
            layout::nth_fixed(self.sections().values, ValueBlob::SIZE, self.n_values(), index)?;
        Ok(ValueInfo::new(self.core.at(offset)))
    }

    /// Iterate all values in order.
    pub fn values(&self) -> impl Iterator<Item = ValueInfo> + '_ {
        (0..self.n_values()).filter_map(|index| self.value(index).ok())
    }

    /// Find a value by name.
    pub fn find_value(&self, name: &str) -> Option<ValueInfo> {
        self.values().find(|value| value.name() == name)
    }

    /// Number of methods.
    pub fn n_methods(&self) -> usize {
        usize::from(self.blob().n_methods)
    }

    /// The Nth method.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`EnumInfo::n_methods`].
    pub fn method(&self, index: usize) -> Result<FunctionInfo> {
        let offset = layout::nth_fixed(
            self.sections().methods,
            FunctionBlob::SIZE,
            self.n_methods(),
            index,
        )?;
        Ok(FunctionInfo::new(self.core.at(offset)))
    }
}

/// An overlapping aggregate, possibly discriminated.
#[derive(Clone, Debug, PartialEq)]
pub struct UnionInfo {
    pub(crate) core: InfoCore,
}

impl UnionInfo {
    pub(crate) fn new(core: InfoCore) -> UnionInfo {
        UnionInfo { core }
    }

    fn blob(&self) -> UnionBlob {
        UnionBlob::read(self.core.data(), self.core.offset).unwrap_or(UnionBlob {
            blob_type: 0,
            flags: UnionFlags::empty(),
            name: 0,
            gtype_name: 0,
            gtype_init: 0,
            size: 0,
            n_fields: 0,
            n_functions: 0,
            copy_func: 0,
            free_func: 0,
            discriminator_offset: 0,
            discriminator_type: crate::schema::SimpleType(0),
        })
    }

    fn sections(&self) -> Result<UnionLayout> {
        UnionLayout::compute(self.core.data(), self.core.offset, &self.blob())
    }

    /// The union name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// Whether the union is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(UnionFlags::DEPRECATED)
    }

    /// Size of the native union in bytes.
    pub fn size(&self) -> u32 {
        self.blob().size
    }

    /// Number of fields.
    pub fn n_fields(&self) -> usize {
        usize::from(self.blob().n_fields)
    }

    /// The Nth field.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`UnionInfo::n_fields`].
    pub fn field(&self, index: usize) -> Result<FieldInfo> {
        let sections = self.sections()?;
        let offset = layout::nth_field(self.core.data(), sections.fields, self.n_fields(), index)?;
        Ok(FieldInfo::new(self.core.at(offset)))
    }

    /// Number of functions.
    pub fn n_methods(&self) -> usize {
        usize::from(self.blob().n_functions)
    }

    /// The Nth function.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`UnionInfo::n_methods`].
    pub fn method(&self, index: usize) -> Result<FunctionInfo> {
        let sections = self.sections()?;
        let offset =
            layout::nth_fixed(sections.functions, FunctionBlob::SIZE, self.n_methods(), index)?;
        Ok(FunctionInfo::new(self.core.at(offset)))
    }

    /// Whether the union records a discriminator.
    pub fn is_discriminated(&self) -> bool {
        self.blob().is_discriminated()
    }

    /// Byte offset of the discriminator inside the native union.
    pub fn discriminator_offset(&self) -> Option<i32> {
        self.is_discriminated()
            .then(|| self.blob().discriminator_offset)
    }

    /// The discriminator type. The descriptor is the last word of the prefix.
    pub fn discriminator_type(&self) -> Option<TypeInfo> {
        self.is_discriminated()
            .then(|| TypeInfo::new(self.core.at(self.core.offset + 36)))
    }

    /// The discriminator constant selecting the Nth field.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`UnionInfo::n_fields`].
    pub fn discriminator(&self, index: usize) -> Result<ConstantInfo> {
        if !self.is_discriminated() {
            return Err(Error::IndexOutOfRange { index, count: 0 });
        }
        let sections = self.sections()?;
        let offset = layout::nth_fixed(
            sections.discriminators,
            ConstantBlob::SIZE,
            self.n_fields(),
            index,
        )?;
        Ok(ConstantInfo::new(self.core.at(offset)))
    }
}
