//! Typed read-only accessors over validated typelib buffers.
//!
//! An info is a cheap handle: an `Arc` to the owning [`crate::Typelib`], an
//! `Arc` to the [`crate::Repository`] it was loaded through, and a byte
//! offset. Cloning an info clones two `Arc`s; the buffer itself is never
//! copied. Because every constructor in this module starts from a validated
//! buffer, accessors do not return structural errors - the only fallible
//! operations are child lookups past a declared count and cross-namespace
//! resolution.
//!
//! # Architecture
//!
//! - [`Info`] - Kind-tagged enum over the per-kind accessors, carrying the
//!   shared operations (name, namespace, deprecation, attributes)
//! - [`FunctionInfo`], [`CallbackInfo`], [`StructInfo`], [`EnumInfo`],
//!   [`ObjectInfo`], [`InterfaceInfo`], [`UnionInfo`], [`ConstantInfo`] -
//!   Top-level entities, one per directory entry kind
//! - [`FieldInfo`], [`PropertyInfo`], [`SignalInfo`], [`VFuncInfo`],
//!   [`ArgInfo`], [`SignatureInfo`], [`TypeInfo`], [`ValueInfo`] - Child
//!   accessors reached through their container
//! - [`UnresolvedInfo`] - A reference into a namespace that is not loaded;
//!   a value, not an error
//!
//! Two infos are equal when they view the same buffer (pointer identity of
//! the `Arc`) at the same offset.

mod callable;
mod children;
mod containers;
mod object;
mod types;

pub use callable::{ArgInfo, CallbackInfo, Direction, FunctionInfo, SignatureInfo, Transfer};
pub use children::{
    ConstantInfo, ConstantValue, FieldInfo, PropertyInfo, SignalInfo, VFuncInfo, ValueInfo,
};
pub use containers::{EnumInfo, StructInfo, UnionInfo};
pub use object::{InterfaceInfo, ObjectInfo};
pub use types::TypeInfo;

use std::sync::Arc;

use crate::{
    repository::Repository,
    schema::{AttributeBlob, BlobType, DirEntry},
    Error, Result, Typelib,
};

/// Shared state of every info: the repository it resolves through, the
/// typelib it reads from, and its blob offset.
#[derive(Clone)]
pub(crate) struct InfoCore {
    pub(crate) repository: Arc<Repository>,
    pub(crate) typelib: Arc<Typelib>,
    pub(crate) offset: usize,
}

impl InfoCore {
    pub(crate) fn new(repository: Arc<Repository>, typelib: Arc<Typelib>, offset: usize) -> InfoCore {
        InfoCore {
            repository,
            typelib,
            offset,
        }
    }

    pub(crate) fn data(&self) -> &[u8] {
        self.typelib.data()
    }

    /// Read the string at `offset`, which validation guarantees terminates.
    pub(crate) fn string(&self, offset: u32) -> &str {
        self.typelib.string(offset).unwrap_or_default()
    }

    /// A sibling core at a different offset.
    pub(crate) fn at(&self, offset: usize) -> InfoCore {
        InfoCore {
            repository: Arc::clone(&self.repository),
            typelib: Arc::clone(&self.typelib),
            offset,
        }
    }

    /// Resolve the 1-based directory index to an info, crossing into other
    /// namespaces through the repository when the entry is non-local.
    pub(crate) fn resolve_entry(&self, index: u16) -> Result<Info> {
        let entry = self.typelib.dir_entry(index)?;
        let name = self.string(entry.name).to_string();

        if entry.local {
            return Ok(Info::from_local_entry(
                Arc::clone(&self.repository),
                Arc::clone(&self.typelib),
                &entry,
            ));
        }

        let namespace = self.string(entry.offset).to_string();
        match self.repository.resolve_remote(&namespace, &name) {
            Some(info) => Ok(info),
            None => Ok(Info::Unresolved(UnresolvedInfo { namespace, name })),
        }
    }

    fn same_view(&self, other: &InfoCore) -> bool {
        Arc::ptr_eq(&self.typelib, &other.typelib) && self.offset == other.offset
    }
}

impl PartialEq for InfoCore {
    fn eq(&self, other: &Self) -> bool {
        self.same_view(other)
    }
}

impl Eq for InfoCore {}

impl std::fmt::Debug for InfoCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoCore")
            .field("namespace", &self.typelib.namespace())
            .field("offset", &self.offset)
            .finish()
    }
}

/// A reference to an entity in a namespace that is not currently loaded.
///
/// Carries the raw strings so the caller can decide to `require` the
/// namespace and retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedInfo {
    /// The defining namespace
    pub namespace: String,
    /// The entity name inside that namespace
    pub name: String,
}

/// Any top-level entity of a typelib, tagged by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Info {
    /// Top-level callable
    Function(FunctionInfo),
    /// Function pointer type
    Callback(CallbackInfo),
    /// Plain aggregate
    Struct(StructInfo),
    /// Aggregate with registered copy/free semantics
    Boxed(StructInfo),
    /// Enumeration
    Enum(EnumInfo),
    /// Bitfield enumeration
    Flags(EnumInfo),
    /// Classed instance type
    Object(ObjectInfo),
    /// Abstract contract type
    Interface(InterfaceInfo),
    /// Typed constant value
    Constant(ConstantInfo),
    /// Overlapping aggregate
    Union(UnionInfo),
    /// Reference into an unloaded namespace
    Unresolved(UnresolvedInfo),
}

impl Info {
    /// Build the info for a local directory entry.
    pub(crate) fn from_local_entry(
        repository: Arc<Repository>,
        typelib: Arc<Typelib>,
        entry: &DirEntry,
    ) -> Info {
        let core = InfoCore::new(repository, typelib, entry.offset as usize);

        // the tag was checked during validation
        match BlobType::from_repr(entry.blob_type) {
            Some(BlobType::Function) => Info::Function(FunctionInfo::new(core)),
            Some(BlobType::Callback) => Info::Callback(CallbackInfo::new(core)),
            Some(BlobType::Struct) => Info::Struct(StructInfo::new(core)),
            Some(BlobType::Boxed) => Info::Boxed(StructInfo::new(core)),
            Some(BlobType::Enum) => Info::Enum(EnumInfo::new(core)),
            Some(BlobType::Flags) => Info::Flags(EnumInfo::new(core)),
            Some(BlobType::Object) => Info::Object(ObjectInfo::new(core)),
            Some(BlobType::Interface) => Info::Interface(InterfaceInfo::new(core)),
            Some(BlobType::Constant) => Info::Constant(ConstantInfo::new(core)),
            Some(BlobType::Union) => Info::Union(UnionInfo::new(core)),
            _ => Info::Unresolved(UnresolvedInfo {
                namespace: String::new(),
                name: String::new(),
            }),
        }
    }

    fn core(&self) -> Option<&InfoCore> {
        match self {
            Info::Function(info) => Some(&info.core),
            Info::Callback(info) => Some(&info.core),
            Info::Struct(info) | Info::Boxed(info) => Some(&info.core),
            Info::Enum(info) | Info::Flags(info) => Some(&info.core),
            Info::Object(info) => Some(&info.core),
            Info::Interface(info) => Some(&info.core),
            Info::Constant(info) => Some(&info.core),
            Info::Union(info) => Some(&info.core),
            Info::Unresolved(_) => None,
        }
    }

    /// The kind tag of this info.
    pub fn kind(&self) -> BlobType {
        match self {
            Info::Function(_) => BlobType::Function,
            Info::Callback(_) => BlobType::Callback,
            Info::Struct(_) => BlobType::Struct,
            Info::Boxed(_) => BlobType::Boxed,
            Info::Enum(_) => BlobType::Enum,
            Info::Flags(_) => BlobType::Flags,
            Info::Object(_) => BlobType::Object,
            Info::Interface(_) => BlobType::Interface,
            Info::Constant(_) => BlobType::Constant,
            Info::Union(_) => BlobType::Union,
            Info::Unresolved(_) => BlobType::Invalid,
        }
    }

    /// The entity name.
    pub fn name(&self) -> &str {
        match self {
            Info::Function(info) => info.name(),
            Info::Callback(info) => info.name(),
            Info::Struct(info) | Info::Boxed(info) => info.name(),
            Info::Enum(info) | Info::Flags(info) => info.name(),
            Info::Object(info) => info.name(),
            Info::Interface(info) => info.name(),
            Info::Constant(info) => info.name(),
            Info::Union(info) => info.name(),
            Info::Unresolved(info) => &info.name,
        }
    }

    /// The namespace the entity is defined in.
    pub fn namespace(&self) -> &str {
        match self {
            Info::Unresolved(info) => &info.namespace,
            _ => self
                .core()
                .map(|core| core.typelib.namespace())
                .unwrap_or_default(),
        }
    }

    /// Whether the entity carries the deprecation flag.
    pub fn is_deprecated(&self) -> bool {
        match self {
            Info::Function(info) => info.is_deprecated(),
            Info::Callback(info) => info.is_deprecated(),
            Info::Struct(info) | Info::Boxed(info) => info.is_deprecated(),
            Info::Enum(info) | Info::Flags(info) => info.is_deprecated(),
            Info::Object(info) => info.is_deprecated(),
            Info::Interface(info) => info.is_deprecated(),
            Info::Constant(info) => info.is_deprecated(),
            Info::Union(info) => info.is_deprecated(),
            Info::Unresolved(_) => false,
        }
    }

    /// Iterate the attributes attached to this entity.
    pub fn attributes(&self) -> AttributeIter<'_> {
        match self.core() {
            Some(core) => AttributeIter::for_offset(core),
            None => AttributeIter::empty(),
        }
    }

    /// Downcast to a function.
    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match self {
            Info::Function(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to a callback.
    pub fn as_callback(&self) -> Option<&CallbackInfo> {
        match self {
            Info::Callback(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to a struct or boxed.
    pub fn as_struct(&self) -> Option<&StructInfo> {
        match self {
            Info::Struct(info) | Info::Boxed(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to an enum or flags.
    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match self {
            Info::Enum(info) | Info::Flags(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to an object.
    pub fn as_object(&self) -> Option<&ObjectInfo> {
        match self {
            Info::Object(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to an interface.
    pub fn as_interface(&self) -> Option<&InterfaceInfo> {
        match self {
            Info::Interface(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to a constant.
    pub fn as_constant(&self) -> Option<&ConstantInfo> {
        match self {
            Info::Constant(info) => Some(info),
            _ => None,
        }
    }

    /// Downcast to a union.
    pub fn as_union(&self) -> Option<&UnionInfo> {
        match self {
            Info::Union(info) => Some(info),
            _ => None,
        }
    }

    /// The enum this info must be, as a typed error.
    ///
    /// # Errors
    /// Returns [`Error::WrongInfoKind`] when the info is any other kind.
    pub fn expect_enum(&self) -> Result<&EnumInfo> {
        self.as_enum().ok_or(Error::WrongInfoKind {
            expected: BlobType::Enum,
            actual: self.kind(),
        })
    }

    /// The object this info must be, as a typed error.
    ///
    /// # Errors
    /// Returns [`Error::WrongInfoKind`] when the info is any other kind.
    pub fn expect_object(&self) -> Result<&ObjectInfo> {
        self.as_object().ok_or(Error::WrongInfoKind {
            expected: BlobType::Object,
            actual: self.kind(),
        })
    }

    /// The function this info must be, as a typed error.
    ///
    /// # Errors
    /// Returns [`Error::WrongInfoKind`] when the info is any other kind.
    pub fn expect_function(&self) -> Result<&FunctionInfo> {
        self.as_function().ok_or(Error::WrongInfoKind {
            expected: BlobType::Function,
            actual: self.kind(),
        })
    }
}

/// Iterator over the (name, value) attribute pairs of one entity.
///
/// The attribute table is sorted by target offset; the iterator binary
/// searches for the start of the entity's run and stops at its end.
pub struct AttributeIter<'a> {
    data: &'a [u8],
    typelib: Option<&'a Typelib>,
    index: usize,
    end: usize,
    table: usize,
}

impl<'a> AttributeIter<'a> {
    fn empty() -> AttributeIter<'a> {
        AttributeIter {
            data: &[],
            typelib: None,
            index: 0,
            end: 0,
            table: 0,
        }
    }

    fn for_offset(core: &'a InfoCore) -> AttributeIter<'a> {
        let header = core.typelib.header();
        let count = header.n_attributes as usize;
        let table = header.attributes as usize;
        let target = core.offset as u32;
        let data = core.data();

        if count == 0 {
            return AttributeIter::empty();
        }

        let record = |index: usize| AttributeBlob::read(data, table + index * AttributeBlob::SIZE);

        // lower bound of the run targeting this offset
        let mut low = 0;
        let mut high = count;
        while low < high {
            let mid = (low + high) / 2;
            match record(mid) {
                Ok(attribute) if attribute.offset < target => low = mid + 1,
                Ok(_) => high = mid,
                Err(_) => return AttributeIter::empty(),
            }
        }

        let mut end = low;
        while end < count {
            match record(end) {
                Ok(attribute) if attribute.offset == target => end += 1,
                _ => break,
            }
        }

        AttributeIter {
            data,
            typelib: Some(core.typelib.as_ref()),
            index: low,
            end,
            table,
        }
    }
}

impl<'a> Iterator for AttributeIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }

        let typelib = self.typelib?;
        let attribute =
            AttributeBlob::read(self.data, self.table + self.index * AttributeBlob::SIZE).ok()?;
        self.index += 1;

        let name = typelib.string(attribute.name).ok()?;
        let value = typelib.string(attribute.value).ok()?;
        Some((name, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.index;
        (remaining, Some(remaining))
    }
}
