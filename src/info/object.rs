//! Classed type accessors: objects and interfaces.

use crate::{
    file::io::read_ne,
    schema::blobs::{
        CommonFlags, ConstantBlob, FunctionBlob, InterfaceBlob, ObjectBlob, ObjectFlags,
        PropertyBlob, SignalBlob, VFuncBlob,
    },
    schema::layout::{self, InterfaceLayout, ObjectLayout},
    Error, Result,
};

use super::{
    ConstantInfo, FieldInfo, FunctionInfo, Info, InfoCore, PropertyInfo, SignalInfo, VFuncInfo,
};

/// A classed instance type.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectInfo {
    pub(crate) core: InfoCore,
}

impl ObjectInfo {
    pub(crate) fn new(core: InfoCore) -> ObjectInfo {
        ObjectInfo { core }
    }

    fn blob(&self) -> ObjectBlob {
        ObjectBlob::read(self.core.data(), self.core.offset).unwrap_or(ObjectBlob {
            blob_type: 0,
            flags: ObjectFlags::empty(),
            name: 0,
            gtype_name: 0,
            gtype_init: 0,
            parent: 0,
            gtype_struct: 0,
            n_interfaces: 0,
            n_fields: 0,
            n_properties: 0,
            n_methods: 0,
            n_signals: 0,
            n_vfuncs: 0,
            n_constants: 0,
            n_field_callbacks: 0,
            ref_func: 0,
            unref_func: 0,
            set_value_func: 0,
            get_value_func: 0,
        })
    }

    fn sections(&self) -> Result<ObjectLayout> {
        ObjectLayout::compute(self.core.data(), self.core.offset, &self.blob())
    }

    /// The object name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The registered runtime type name.
    pub fn runtime_type_name(&self) -> &str {
        self.core.string(self.blob().gtype_name)
    }

    /// The runtime type init symbol.
    pub fn runtime_type_init(&self) -> &str {
        self.core.string(self.blob().gtype_init)
    }

    /// Whether the object is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(ObjectFlags::DEPRECATED)
    }

    /// Whether the object cannot be instantiated.
    pub fn is_abstract(&self) -> bool {
        self.blob().flags.contains(ObjectFlags::ABSTRACT)
    }

    /// Whether the object is a fundamental type with custom ref/unref.
    pub fn is_fundamental(&self) -> bool {
        self.blob().flags.contains(ObjectFlags::FUNDAMENTAL)
    }

    /// Whether the object cannot be subclassed.
    pub fn is_final(&self) -> bool {
        self.blob().flags.contains(ObjectFlags::FINAL)
    }

    /// Resolve the parent object, when one is declared.
    pub fn parent(&self) -> Option<Result<Info>> {
        let parent = self.blob().parent;
        (parent != 0).then(|| self.core.resolve_entry(parent))
    }

    /// Resolve the class struct, when one is declared.
    pub fn class_struct(&self) -> Option<Result<Info>> {
        let index = self.blob().gtype_struct;
        (index != 0).then(|| self.core.resolve_entry(index))
    }

    /// Number of implemented interfaces.
    pub fn n_interfaces(&self) -> usize {
        usize::from(self.blob().n_interfaces)
    }

    /// Resolve the Nth implemented interface.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_interfaces`].
    pub fn interface(&self, index: usize) -> Result<Info> {
        let count = self.n_interfaces();
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }

        let sections = self.sections()?;
        let entry = read_ne::<u16>(self.core.data(), sections.interfaces + index * 2)?;
        self.core.resolve_entry(entry)
    }

    /// Number of fields.
    pub fn n_fields(&self) -> usize {
        usize::from(self.blob().n_fields)
    }

    /// The Nth field.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_fields`].
    pub fn field(&self, index: usize) -> Result<FieldInfo> {
        let sections = self.sections()?;
        let offset = layout::nth_field(self.core.data(), sections.fields, self.n_fields(), index)?;
        Ok(FieldInfo::new(self.core.at(offset)))
    }

    /// Number of properties.
    pub fn n_properties(&self) -> usize {
        usize::from(self.blob().n_properties)
    }

    /// The Nth property.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_properties`].
    pub fn property(&self, index: usize) -> Result<PropertyInfo> {
        let sections = self.sections()?;
        let offset =
            layout::nth_fixed(sections.properties, PropertyBlob::SIZE, self.n_properties(), index)?;
        Ok(PropertyInfo::new(self.core.at(offset)))
    }

    /// Number of methods.
    pub fn n_methods(&self) -> usize {
        usize::from(self.blob().n_methods)
    }

    /// The Nth method.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_methods`].
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

    /// Number of signals.
    pub fn n_signals(&self) -> usize {
        usize::from(self.blob().n_signals)
    }

    /// The Nth signal.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_signals`].
    pub fn signal(&self, index: usize) -> Result<SignalInfo> {
        let sections = self.sections()?;
        let offset =
            layout::nth_fixed(sections.signals, SignalBlob::SIZE, self.n_signals(), index)?;
        Ok(SignalInfo::new(self.core.at(offset)))
    }

    /// Number of virtual functions.
    pub fn n_vfuncs(&self) -> usize {
        usize::from(self.blob().n_vfuncs)
    }

    /// The Nth virtual function.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_vfuncs`].
    pub fn vfunc(&self, index: usize) -> Result<VFuncInfo> {
        let sections = self.sections()?;
        let offset = layout::nth_fixed(sections.vfuncs, VFuncBlob::SIZE, self.n_vfuncs(), index)?;
        Ok(VFuncInfo::new(self.core.at(offset)))
    }

    /// Number of constants.
    pub fn n_constants(&self) -> usize {
        usize::from(self.blob().n_constants)
    }

    /// The Nth constant.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`ObjectInfo::n_constants`].
    pub fn constant(&self, index: usize) -> Result<ConstantInfo> {
        let sections = self.sections()?;
        let offset =
            layout::nth_fixed(sections.constants, ConstantBlob::SIZE, self.n_constants(), index)?;
        Ok(ConstantInfo::new(self.core.at(offset)))
    }

    /// The ref function symbol, for fundamental types.
    pub fn ref_function(&self) -> Option<&str> {
        let offset = self.blob().ref_func;
        (offset != 0).then(|| self.core.string(offset))
    }

    /// The unref function symbol, for fundamental types.
    pub fn unref_function(&self) -> Option<&str> {
        let offset = self.blob().unref_func;
        (offset != 0).then(|| self.core.string(offset))
    }
}

/// An abstract contract type.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceInfo {
    pub(crate) core: InfoCore,
}

impl InterfaceInfo {
    pub(crate) fn new(core: InfoCore) -> InterfaceInfo {
        InterfaceInfo { core }
    }

    fn blob(&self) -> InterfaceBlob {
        InterfaceBlob::read(self.core.data(), self.core.offset).unwrap_or(InterfaceBlob {
            blob_type: 0,
            flags: CommonFlags::empty(),
            name: 0,
            gtype_name: 0,
            gtype_init: 0,
            gtype_struct: 0,
            n_prerequisites: 0,
            n_properties: 0,
            n_methods: 0,
            n_signals: 0,
            n_vfuncs: 0,
            n_constants: 0,
        })
    }

    fn sections(&self) -> InterfaceLayout {
        InterfaceLayout::compute(self.core.offset, &self.blob())
    }

    /// The interface name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The registered runtime type name.
    pub fn runtime_type_name(&self) -> &str {
        self.core.string(self.blob().gtype_name)
    }

    /// Whether the interface is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(CommonFlags::DEPRECATED)
    }

    /// Resolve the iface struct, when one is declared.
    pub fn iface_struct(&self) -> Option<Result<Info>> {
        let index = self.blob().gtype_struct;
        (index != 0).then(|| self.core.resolve_entry(index))
    }

    /// Number of prerequisites.
    pub fn n_prerequisites(&self) -> usize {
        usize::from(self.blob().n_prerequisites)
    }

    /// Resolve the Nth prerequisite.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`InterfaceInfo::n_prerequisites`].
    pub fn prerequisite(&self, index: usize) -> Result<Info> {
        let count = self.n_prerequisites();
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }

        let entry = read_ne::<u16>(self.core.data(), self.sections().prerequisites + index * 2)?;
        self.core.resolve_entry(entry)
    }

    /// Number of properties.
    pub fn n_properties(&self) -> usize {
        usize::from(self.blob().n_properties)
    }

    /// The Nth property.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`InterfaceInfo::n_properties`].
    pub fn property(&self, index: usize) -> Result<PropertyInfo> {
        let offset = layout::nth_fixed(
            self.sections().properties,
            PropertyBlob::SIZE,
            self.n_properties(),
            index,
        )?;
        Ok(PropertyInfo::new(self.core.at(offset)))
    }

    /// Number of methods.
    pub fn n_methods(&self) -> usize {
        usize::from(self.blob().n_methods)
    }

    /// The Nth method.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`InterfaceInfo::n_methods`].
    pub fn method(&self, index: usize) -> Result<FunctionInfo> {
        let offset = layout::nth_fixed(
            self.sections().methods,
            FunctionBlob::SIZE,
            self.n_methods(),
            index,
        )?;
        Ok(FunctionInfo::new(self.core.at(offset)))
    }

    /// Find a method by name.
    pub fn find_method(&self, name: &str) -> Option<FunctionInfo> {
        (0..self.n_methods())
            .filter_map(|index| self.method(index).ok())
            .find(|method| method.name() == name)
    }

    /// Number of signals.
    pub fn n_signals(&self) -> usize {
        usize::from(self.blob().n_signals)
    }

    /// The Nth signal.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`InterfaceInfo::n_signals`].
    pub fn signal(&self, index: usize) -> Result<SignalInfo> {
        let offset = layout::nth_fixed(
            self.sections().signals,
            SignalBlob::SIZE,
            self.n_signals(),
            index,
        )?;
        Ok(SignalInfo::new(self.core.at(offset)))
    }

    /// Number of virtual functions.
    pub fn n_vfuncs(&self) -> usize {
        usize::from(self.blob().n_vfuncs)
    }

    /// The Nth virtual function.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`InterfaceInfo::n_vfuncs`].
    pub fn vfunc(&self, index: usize) -> Result<VFuncInfo> {
        let offset = layout::nth_fixed(
            self.sections().vfuncs,
            VFuncBlob::SIZE,
            self.n_vfuncs(),
            index,
        )?;
        Ok(VFuncInfo::new(self.core.at(offset)))
    }

    /// Number of constants.
    pub fn n_constants(&self) -> usize {
        usize::from(self.blob().n_constants)
    }

    /// The Nth constant.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`InterfaceInfo::n_constants`].
    pub fn constant(&self, index: usize) -> Result<ConstantInfo> {
        let offset = layout::nth_fixed(
            self.sections().constants,
            ConstantBlob::SIZE,
            self.n_constants(),
            index,
        )?;
        Ok(ConstantInfo::new(self.core.at(offset)))
    }
}
