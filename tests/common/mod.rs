//! Shared test support: a typelib builder that assembles complete, valid
//! buffers byte by byte.
//!
//! The builder lays the buffer out as header, string area, directory, blob
//! area, attribute table, then the optional section table with the embedded
//! name index. The string area starts right after the header so string
//! offsets are final as soon as a string is interned; blob-area offsets stay
//! relative until `build` knows where the blob area lands and rebases them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use typescope::hash::PerfectHashBuilder;
use typescope::schema::{header::HEADER_SIZE, BlobType, TYPELIB_MAGIC};

/// Declared blob sizes in header order, matching the compiled layout.
#[rustfmt::skip]
const BLOB_SIZES: [u16; 18] = [
    12, // entry
    20, // function
    12, // callback
    12, // signal
    16, // vfunc
    16, // arg
    16, // property
    16, // field
    12, // value
    12, // attribute
    20, // constant
    0,  // error_domain (reserved)
    8,  // signature
    24, // enum
    32, // struct
    60, // object
    40, // interface
    40, // union
];

fn align4(value: usize) -> usize {
    value.div_ceil(4) * 4
}

/// A type descriptor under construction: either a finished inline word or a
/// blob-relative offset to a complex type blob.
#[derive(Clone, Copy)]
pub enum TypeRef {
    Inline(u32),
    Offset(u32),
}

impl From<u32> for TypeRef {
    fn from(raw: u32) -> TypeRef {
        TypeRef::Inline(raw)
    }
}

/// One argument of a signature under construction: name, raw flag word,
/// type descriptor.
pub struct ArgSpec<'a> {
    pub name: &'a str,
    pub flags: u32,
    pub arg_type: TypeRef,
}

impl<'a> ArgSpec<'a> {
    pub fn input(name: &'a str, arg_type: u32) -> ArgSpec<'a> {
        ArgSpec {
            name,
            flags: 1, // IN
            arg_type: TypeRef::Inline(arg_type),
        }
    }

    pub fn output(name: &'a str, arg_type: u32) -> ArgSpec<'a> {
        ArgSpec {
            name,
            flags: 1 << 1, // OUT
            arg_type: TypeRef::Inline(arg_type),
        }
    }

    pub fn typed(name: &'a str, flags: u32, arg_type: TypeRef) -> ArgSpec<'a> {
        ArgSpec {
            name,
            flags,
            arg_type,
        }
    }
}

/// Everything an object entry can carry; all members default to empty.
#[derive(Default)]
pub struct ObjectSpec<'a> {
    pub flags: u16,
    pub parent: u16,
    pub gtype_struct: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<(&'a str, u32, u16)>,
    pub properties: Vec<(&'a str, u32, u32)>,
    pub methods: Vec<(&'a str, &'a str, u32)>,
    pub signals: Vec<(&'a str, u16, u32)>,
    pub vfuncs: Vec<(&'a str, u16, u32)>,
    pub constants: Vec<(&'a str, u32, Vec<u8>)>,
}

/// Everything an interface entry can carry.
#[derive(Default)]
pub struct InterfaceSpec<'a> {
    pub gtype_struct: u16,
    pub prerequisites: Vec<u16>,
    pub properties: Vec<(&'a str, u32, u32)>,
    pub methods: Vec<(&'a str, &'a str, u32)>,
    pub signals: Vec<(&'a str, u16, u32)>,
    pub vfuncs: Vec<(&'a str, u16, u32)>,
    pub constants: Vec<(&'a str, u32, Vec<u8>)>,
}

enum EntryTarget {
    /// Blob-area-relative offset
    Blob(u32),
    /// Absolute string offset of the defining namespace
    Namespace(u32),
}

struct RawEntry {
    blob_type: u16,
    name: u32,
    target: EntryTarget,
}

/// Assembles a complete typelib buffer.
pub struct TypelibBuilder {
    namespace: String,
    version: String,
    c_prefix: Option<String>,
    shared_library: Option<String>,
    dependencies: Vec<String>,
    with_index: bool,
    strings: Vec<u8>,
    interned: HashMap<String, u32>,
    blobs: Vec<u8>,
    /// Positions inside `blobs` holding blob-relative u32 offsets that must
    /// be rebased once the blob area's absolute position is known
    relocations: Vec<usize>,
    entries: Vec<RawEntry>,
    /// (blob-relative target, name, value)
    attributes: Vec<(u32, u32, u32)>,
}

impl TypelibBuilder {
    pub fn new(namespace: &str, version: &str) -> TypelibBuilder {
        TypelibBuilder {
            namespace: namespace.to_string(),
            version: version.to_string(),
            c_prefix: None,
            shared_library: None,
            dependencies: Vec::new(),
            with_index: false,
            strings: Vec::new(),
            interned: HashMap::new(),
            blobs: Vec::new(),
            relocations: Vec::new(),
            entries: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn c_prefix(mut self, prefix: &str) -> TypelibBuilder {
        self.c_prefix = Some(prefix.to_string());
        self
    }

    pub fn shared_library(mut self, modules: &str) -> TypelibBuilder {
        self.shared_library = Some(modules.to_string());
        self
    }

    pub fn dependency(mut self, spec: &str) -> TypelibBuilder {
        self.dependencies.push(spec.to_string());
        self
    }

    pub fn with_index(mut self) -> TypelibBuilder {
        self.with_index = true;
        self
    }

    /// Intern a string, returning its absolute offset. The string area sits
    /// right after the header, so offsets are final immediately.
    pub fn intern(&mut self, text: &str) -> u32 {
        if let Some(&offset) = self.interned.get(text) {
            return offset;
        }

        let offset = (HEADER_SIZE + self.strings.len()) as u32;
        self.strings.extend_from_slice(text.as_bytes());
        self.strings.push(0);
        self.interned.insert(text.to_string(), offset);
        offset
    }

    fn pad_blobs(&mut self) {
        while self.blobs.len() % 4 != 0 {
            self.blobs.push(0);
        }
    }

    fn push_u8(&mut self, value: u8) {
        self.blobs.push(value);
    }

    fn push_u16(&mut self, value: u16) {
        self.blobs.extend_from_slice(&value.to_ne_bytes());
    }

    fn push_u32(&mut self, value: u32) {
        self.blobs.extend_from_slice(&value.to_ne_bytes());
    }

    fn push_i32(&mut self, value: i32) {
        self.blobs.extend_from_slice(&value.to_ne_bytes());
    }

    /// Push a blob-relative u32 that `build` will rebase to absolute.
    fn push_blob_ref(&mut self, relative: u32) {
        self.relocations.push(self.blobs.len());
        self.push_u32(relative);
    }

    fn push_string_ref(&mut self, text: &str) {
        let offset = self.intern(text);
        self.push_u32(offset);
    }

    fn push_optional_string_ref(&mut self, text: Option<&str>) {
        match text {
            Some(text) => self.push_string_ref(text),
            None => self.push_u32(0),
        }
    }

    /// Register a directory entry pointing at a blob-relative offset.
    pub fn entry(&mut self, blob_type: BlobType, name: &str, relative: u32) {
        let name = self.intern(name);
        self.entries.push(RawEntry {
            blob_type: blob_type as u16,
            name,
            target: EntryTarget::Blob(relative),
        });
    }

    /// Register a non-local directory entry referencing another namespace.
    pub fn remote_entry(&mut self, blob_type: BlobType, name: &str, namespace: &str) {
        let name = self.intern(name);
        let namespace = self.intern(namespace);
        self.entries.push(RawEntry {
            blob_type: blob_type as u16,
            name,
            target: EntryTarget::Namespace(namespace),
        });
    }

    /// Attach an attribute to the blob at `relative`.
    pub fn attribute(&mut self, relative: u32, name: &str, value: &str) {
        let name = self.intern(name);
        let value = self.intern(value);
        self.attributes.push((relative, name, value));
    }

    fn push_type(&mut self, descriptor: TypeRef) {
        match descriptor {
            TypeRef::Inline(raw) => self.push_u32(raw),
            TypeRef::Offset(relative) => self.push_blob_ref(relative),
        }
    }

    /// Write a signature blob; returns its blob-relative offset.
    pub fn signature(
        &mut self,
        return_type: impl Into<TypeRef>,
        flags: u16,
        args: &[ArgSpec],
    ) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_type(return_type.into());
        self.push_u16(flags);
        self.push_u16(args.len() as u16);
        for arg in args {
            self.push_string_ref(arg.name);
            self.push_u32(arg.flags);
            self.push_u8(u8::MAX); // closure = -1
            self.push_u8(u8::MAX); // destroy = -1
            self.push_u16(0);
            self.push_type(arg.arg_type);
        }
        position
    }

    /// Write a C-array complex type blob over an inline element type.
    pub fn array_type(&mut self, zero_terminated: bool, element: u32) -> TypeRef {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        // tag Array in bits 3-7, zero-terminated bit 8, kind C in bits 11-12
        let mut bits: u16 = 15 << 3;
        if zero_terminated {
            bits |= 1 << 8;
        }
        self.push_u16(bits);
        self.push_u16(0); // dimension
        self.push_u32(element);
        TypeRef::Offset(position)
    }

    /// Write a list complex type blob over an inline element type.
    pub fn list_type(&mut self, element: u32) -> TypeRef {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u8((17 << 3) | 1); // tag List, pointer
        self.push_u8(0);
        self.push_u16(1); // one type parameter
        self.push_u32(element);
        TypeRef::Offset(position)
    }

    /// Write a hash complex type blob over inline key/value types.
    pub fn hash_type(&mut self, key: u32, value: u32) -> TypeRef {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u8((19 << 3) | 1); // tag Hash, pointer
        self.push_u8(0);
        self.push_u16(2);
        self.push_u32(key);
        self.push_u32(value);
        TypeRef::Offset(position)
    }

    /// Write an error complex type blob.
    pub fn error_type(&mut self) -> TypeRef {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u8((20 << 3) | 1); // tag Error, pointer
        self.push_u8(0);
        self.push_u16(0); // n_domains, reserved
        TypeRef::Offset(position)
    }

    /// Write an interface complex type blob referencing a directory entry.
    pub fn interface_type(&mut self, entry_index: u16) -> TypeRef {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u8((16 << 3) | 1); // tag Interface, pointer
        self.push_u8(0);
        self.push_u16(entry_index);
        TypeRef::Offset(position)
    }

    /// Write a function blob (no directory entry); returns its offset.
    pub fn function_blob(
        &mut self,
        name: &str,
        symbol: &str,
        flags: u16,
        flags2: u16,
        signature: u32,
    ) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Function as u16);
        self.push_u16(flags);
        self.push_string_ref(name);
        self.push_string_ref(symbol);
        self.push_blob_ref(signature);
        self.push_u16(flags2);
        self.push_u16(0);
        position
    }

    /// A top-level static function with its directory entry.
    pub fn add_function(&mut self, name: &str, symbol: &str, signature: u32) -> u32 {
        let position = self.function_blob(name, symbol, 0, 1, signature);
        self.entry(BlobType::Function, name, position);
        position
    }

    /// A top-level callback with its directory entry.
    pub fn add_callback(&mut self, name: &str, signature: u32) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Callback as u16);
        self.push_u16(0);
        self.push_string_ref(name);
        self.push_blob_ref(signature);

        self.entry(BlobType::Callback, name, position);
        position
    }

    /// An enum with int32 storage and its directory entry. A runtime type
    /// name registers the enum; without one it is marked unregistered.
    pub fn add_enum(
        &mut self,
        name: &str,
        gtype_name: Option<&str>,
        values: &[(&str, i32)],
    ) -> u32 {
        self.enum_blob(BlobType::Enum, name, gtype_name, None, values)
    }

    /// An enum modeling an error domain.
    pub fn add_error_enum(&mut self, name: &str, domain: &str, values: &[(&str, i32)]) -> u32 {
        self.enum_blob(BlobType::Enum, name, None, Some(domain), values)
    }

    /// A flags type, sharing the enum layout.
    pub fn add_flags(&mut self, name: &str, values: &[(&str, i32)]) -> u32 {
        self.enum_blob(BlobType::Flags, name, None, None, values)
    }

    fn enum_blob(
        &mut self,
        blob_type: BlobType,
        name: &str,
        gtype_name: Option<&str>,
        error_domain: Option<&str>,
        values: &[(&str, i32)],
    ) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        // storage int32 in bits 2-6, unregistered bit 1 when no runtime type
        let mut flags: u16 = 6 << 2;
        if gtype_name.is_none() {
            flags |= 1 << 1;
        }
        let gtype_init = gtype_name.map(|_| format!("{}_get_type", name.to_lowercase()));

        self.push_u16(blob_type as u16);
        self.push_u16(flags);
        self.push_string_ref(name);
        self.push_optional_string_ref(gtype_name);
        self.push_optional_string_ref(gtype_init.as_deref());
        self.push_u16(values.len() as u16);
        self.push_u16(0); // n_methods
        self.push_optional_string_ref(error_domain);

        for &(value_name, value) in values {
            self.push_u32(0);
            self.push_string_ref(value_name);
            self.push_i32(value);
        }

        self.entry(blob_type, name, position);
        position
    }

    /// A scalar or string constant with its directory entry. `const_type`
    /// must be an inline descriptor and `literal` the exact encoded bytes
    /// (strings include the NUL terminator).
    pub fn add_constant(&mut self, name: &str, const_type: u32, literal: &[u8]) -> u32 {
        let literal_position = self.literal(literal);

        self.pad_blobs();
        let position = self.blobs.len() as u32;
        self.push_u16(BlobType::Constant as u16);
        self.push_u16(0);
        self.push_string_ref(name);
        self.push_u32(const_type);
        self.push_u32(literal.len() as u32);
        self.push_blob_ref(literal_position);

        self.entry(BlobType::Constant, name, position);
        position
    }

    fn literal(&mut self, bytes: &[u8]) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;
        self.blobs.extend_from_slice(bytes);
        position
    }

    fn field_record(&mut self, name: &str, field_type: u32, struct_offset: u16) {
        self.push_string_ref(name);
        self.push_u8(0b11); // readable | writable
        self.push_u8(0);
        self.push_u16(struct_offset);
        self.push_u32(0);
        self.push_u32(field_type);
    }

    fn method_records(&mut self, methods: &[(&str, &str, u32)]) {
        for &(name, symbol, signature) in methods {
            self.push_u16(BlobType::Function as u16);
            self.push_u16(0);
            self.push_string_ref(name);
            self.push_string_ref(symbol);
            self.push_blob_ref(signature);
            self.push_u16(0b10); // is_method
            self.push_u16(0);
        }
    }

    fn property_records(&mut self, properties: &[(&str, u32, u32)]) {
        for &(name, flags, prop_type) in properties {
            self.push_string_ref(name);
            self.push_u32(flags);
            self.push_u16(0); // setter
            self.push_u16(0); // getter
            self.push_u32(prop_type);
        }
    }

    fn signal_records(&mut self, signals: &[(&str, u16, u32)]) {
        for &(name, flags, signature) in signals {
            self.push_u16(flags);
            self.push_u16(0); // class_closure
            self.push_string_ref(name);
            self.push_blob_ref(signature);
        }
    }

    fn vfunc_records(&mut self, vfuncs: &[(&str, u16, u32)]) {
        for &(name, struct_offset, signature) in vfuncs {
            self.push_string_ref(name);
            self.push_u16(0); // flags
            self.push_u16(0); // signal
            self.push_u16(struct_offset);
            self.push_u16(0); // invoker
            self.push_blob_ref(signature);
        }
    }

    fn constant_records(&mut self, constants: &[(&str, u32, u32, u32)]) {
        for &(name, const_type, size, literal) in constants {
            self.push_u16(BlobType::Constant as u16);
            self.push_u16(0);
            self.push_string_ref(name);
            self.push_u32(const_type);
            self.push_u32(size);
            self.push_blob_ref(literal);
        }
    }

    /// Pre-place constant literals, returning records for `constant_records`.
    fn place_literals<'a>(
        &mut self,
        constants: &'a [(&'a str, u32, Vec<u8>)],
    ) -> Vec<(&'a str, u32, u32, u32)> {
        constants
            .iter()
            .map(|(name, const_type, literal)| {
                let position = self.literal(literal);
                (*name, *const_type, literal.len() as u32, position)
            })
            .collect()
    }

    /// A struct with fields and methods, plus its directory entry.
    pub fn add_struct(
        &mut self,
        name: &str,
        size: u32,
        fields: &[(&str, u32, u16)],
        methods: &[(&str, &str, u32)],
    ) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Struct as u16);
        self.push_u16(1 << 1); // unregistered
        self.push_string_ref(name);
        self.push_u32(0); // gtype_name
        self.push_u32(0); // gtype_init
        self.push_u32(size);
        self.push_u16(fields.len() as u16);
        self.push_u16(methods.len() as u16);
        self.push_u32(0); // copy_func
        self.push_u32(0); // free_func

        for &(field_name, field_type, struct_offset) in fields {
            self.field_record(field_name, field_type, struct_offset);
        }
        self.method_records(methods);

        self.entry(BlobType::Struct, name, position);
        position
    }

    /// A struct whose middle field is a function pointer with an inline
    /// callback record, so field strides vary while walking.
    pub fn add_struct_with_callback_field(
        &mut self,
        name: &str,
        callback_name: &str,
        signature: u32,
    ) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Struct as u16);
        self.push_u16(1 << 1); // unregistered
        self.push_string_ref(name);
        self.push_u32(0); // gtype_name
        self.push_u32(0); // gtype_init
        self.push_u32(24);
        self.push_u16(3); // n_fields
        self.push_u16(0); // n_methods
        self.push_u32(0); // copy_func
        self.push_u32(0); // free_func

        self.field_record("id", ty::int32(), 0);

        // the callback field: type word unused, the record follows inline
        self.push_string_ref(callback_name);
        self.push_u8(0b101); // readable | embedded type
        self.push_u8(0);
        self.push_u16(8);
        self.push_u32(0);
        self.push_u32(0);
        self.push_u16(BlobType::Callback as u16);
        self.push_u16(0);
        self.push_string_ref(callback_name);
        self.push_blob_ref(signature);

        self.field_record("tag", ty::int32(), 16);

        self.entry(BlobType::Struct, name, position);
        position
    }

    /// A union with plain fields, plus its directory entry.
    pub fn add_union(&mut self, name: &str, size: u32, fields: &[(&str, u32, u16)]) -> u32 {
        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Union as u16);
        self.push_u16(1 << 1); // unregistered
        self.push_string_ref(name);
        self.push_u32(0); // gtype_name
        self.push_u32(0); // gtype_init
        self.push_u32(size);
        self.push_u16(fields.len() as u16);
        self.push_u16(0); // n_functions
        self.push_u32(0); // copy_func
        self.push_u32(0); // free_func
        self.push_i32(0); // discriminator_offset
        self.push_u32(0); // discriminator_type

        for &(field_name, field_type, struct_offset) in fields {
            self.field_record(field_name, field_type, struct_offset);
        }

        self.entry(BlobType::Union, name, position);
        position
    }

    /// An object with the full child complement, plus its directory entry.
    pub fn add_object(&mut self, name: &str, gtype_name: &str, spec: ObjectSpec) -> u32 {
        let gtype_init = format!("{}_get_type", name.to_lowercase());
        let literals = self.place_literals(&spec.constants);

        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Object as u16);
        self.push_u16(spec.flags);
        self.push_string_ref(name);
        self.push_string_ref(gtype_name);
        self.push_string_ref(&gtype_init);
        self.push_u16(spec.parent);
        self.push_u16(spec.gtype_struct);
        self.push_u16(spec.interfaces.len() as u16);
        self.push_u16(spec.fields.len() as u16);
        self.push_u16(spec.properties.len() as u16);
        self.push_u16(spec.methods.len() as u16);
        self.push_u16(spec.signals.len() as u16);
        self.push_u16(spec.vfuncs.len() as u16);
        self.push_u16(spec.constants.len() as u16);
        self.push_u16(0); // n_field_callbacks
        self.push_u32(0); // ref_func
        self.push_u32(0); // unref_func
        self.push_u32(0); // set_value_func
        self.push_u32(0); // get_value_func
        self.push_u32(0); // reserved
        self.push_u32(0); // reserved

        for &interface in &spec.interfaces {
            self.push_u16(interface);
        }
        if spec.interfaces.len() % 2 != 0 {
            self.push_u16(0); // even padding
        }

        for &(field_name, field_type, struct_offset) in &spec.fields {
            self.field_record(field_name, field_type, struct_offset);
        }
        self.property_records(&spec.properties);
        self.method_records(&spec.methods);
        self.signal_records(&spec.signals);
        self.vfunc_records(&spec.vfuncs);
        self.constant_records(&literals);

        self.entry(BlobType::Object, name, position);
        position
    }

    /// An interface with the full child complement, plus its directory entry.
    pub fn add_interface(&mut self, name: &str, gtype_name: &str, spec: InterfaceSpec) -> u32 {
        let gtype_init = format!("{}_get_type", name.to_lowercase());
        let literals = self.place_literals(&spec.constants);

        self.pad_blobs();
        let position = self.blobs.len() as u32;

        self.push_u16(BlobType::Interface as u16);
        self.push_u16(0);
        self.push_string_ref(name);
        self.push_string_ref(gtype_name);
        self.push_string_ref(&gtype_init);
        self.push_u16(spec.gtype_struct);
        self.push_u16(spec.prerequisites.len() as u16);
        self.push_u16(spec.properties.len() as u16);
        self.push_u16(spec.methods.len() as u16);
        self.push_u16(spec.signals.len() as u16);
        self.push_u16(spec.vfuncs.len() as u16);
        self.push_u16(spec.constants.len() as u16);
        self.push_u16(0); // padding
        self.push_u32(0); // reserved
        self.push_u32(0); // reserved

        for &prerequisite in &spec.prerequisites {
            self.push_u16(prerequisite);
        }
        if spec.prerequisites.len() % 2 != 0 {
            self.push_u16(0);
        }

        self.property_records(&spec.properties);
        self.method_records(&spec.methods);
        self.signal_records(&spec.signals);
        self.vfunc_records(&spec.vfuncs);
        self.constant_records(&literals);

        self.entry(BlobType::Interface, name, position);
        position
    }

    /// Assemble the final buffer.
    pub fn build(mut self) -> Vec<u8> {
        // locals first: directory indices embedded in blobs and in the name
        // index assume the final, partitioned order
        self.entries
            .sort_by_key(|entry| matches!(entry.target, EntryTarget::Namespace(_)));

        let namespace = self.intern(&self.namespace.clone());
        let nsversion = self.intern(&self.version.clone());
        let c_prefix = match self.c_prefix.clone() {
            Some(prefix) => self.intern(&prefix),
            None => 0,
        };
        let shared_library = match self.shared_library.clone() {
            Some(modules) => self.intern(&modules),
            None => 0,
        };
        let dependencies = if self.dependencies.is_empty() {
            0
        } else {
            let list = self.dependencies.join("|");
            self.intern(&list)
        };

        let n_entries = self.entries.len();
        let directory = align4(HEADER_SIZE + self.strings.len());
        let blob_base = align4(directory + n_entries * 12);
        let blob_end = blob_base + self.blobs.len();

        let attributes_offset = if self.attributes.is_empty() {
            0
        } else {
            align4(blob_end)
        };
        let after_attributes = if attributes_offset == 0 {
            blob_end
        } else {
            attributes_offset + self.attributes.len() * 12
        };

        let sections_offset = if self.with_index {
            align4(after_attributes)
        } else {
            0
        };

        let index_payload = if self.with_index {
            let keys: Vec<(String, u16)> = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| matches!(entry.target, EntryTarget::Blob(_)))
                .map(|(position, entry)| {
                    let name = lookup_interned(&self.strings, entry.name);
                    (name, (position + 1) as u16)
                })
                .collect();
            PerfectHashBuilder::new(&keys).build()
        } else {
            Vec::new()
        };
        // two section records (index + terminator) precede the payload
        let index_offset = sections_offset + 16;

        let total = if self.with_index {
            index_offset + index_payload.len()
        } else {
            after_attributes
        };

        let mut data = Vec::with_capacity(total);

        // header
        data.extend_from_slice(TYPELIB_MAGIC);
        data.push(4); // major
        data.push(0); // minor
        data.extend_from_slice(&0u16.to_ne_bytes()); // reserved
        data.extend_from_slice(&(n_entries as u16).to_ne_bytes());
        let n_local = self
            .entries
            .iter()
            .filter(|entry| matches!(entry.target, EntryTarget::Blob(_)))
            .count() as u16;
        data.extend_from_slice(&n_local.to_ne_bytes());
        data.extend_from_slice(&(directory as u32).to_ne_bytes());
        data.extend_from_slice(&(self.attributes.len() as u32).to_ne_bytes());
        data.extend_from_slice(&(attributes_offset as u32).to_ne_bytes());
        data.extend_from_slice(&dependencies.to_ne_bytes());
        data.extend_from_slice(&(total as u32).to_ne_bytes());
        data.extend_from_slice(&namespace.to_ne_bytes());
        data.extend_from_slice(&nsversion.to_ne_bytes());
        data.extend_from_slice(&shared_library.to_ne_bytes());
        data.extend_from_slice(&c_prefix.to_ne_bytes());
        for size in BLOB_SIZES {
            data.extend_from_slice(&size.to_ne_bytes());
        }
        data.extend_from_slice(&(sections_offset as u32).to_ne_bytes());
        data.extend_from_slice(&[0u8; 12]);
        assert_eq!(data.len(), HEADER_SIZE);

        // strings, then the directory
        data.extend_from_slice(&self.strings);
        data.resize(directory, 0);
        for entry in &self.entries {
            data.extend_from_slice(&entry.blob_type.to_ne_bytes());
            let local = matches!(entry.target, EntryTarget::Blob(_));
            data.extend_from_slice(&u16::from(local).to_ne_bytes());
            data.extend_from_slice(&entry.name.to_ne_bytes());
            let offset = match entry.target {
                EntryTarget::Blob(relative) => blob_base as u32 + relative,
                EntryTarget::Namespace(string) => string,
            };
            data.extend_from_slice(&offset.to_ne_bytes());
        }

        // blob area, with intra-blob references rebased
        data.resize(blob_base, 0);
        for position in &self.relocations {
            let bytes: [u8; 4] = self.blobs[*position..position + 4].try_into().unwrap();
            let rebased = u32::from_ne_bytes(bytes) + blob_base as u32;
            self.blobs[*position..position + 4].copy_from_slice(&rebased.to_ne_bytes());
        }
        data.extend_from_slice(&self.blobs);

        // attribute table, sorted by rebased target
        if attributes_offset != 0 {
            data.resize(attributes_offset, 0);
            let mut attributes = self.attributes.clone();
            attributes.sort_by_key(|(target, _, _)| *target);
            for (target, name, value) in attributes {
                data.extend_from_slice(&(blob_base as u32 + target).to_ne_bytes());
                data.extend_from_slice(&name.to_ne_bytes());
                data.extend_from_slice(&value.to_ne_bytes());
            }
        }

        // section table and index payload
        if self.with_index {
            data.resize(sections_offset, 0);
            data.extend_from_slice(&1u32.to_ne_bytes()); // directory index section
            data.extend_from_slice(&(index_offset as u32).to_ne_bytes());
            data.extend_from_slice(&0u32.to_ne_bytes()); // terminator
            data.extend_from_slice(&0u32.to_ne_bytes());
            data.extend_from_slice(&index_payload);
        }

        assert_eq!(data.len(), total);
        data
    }
}

/// Read back an interned string by its absolute offset.
fn lookup_interned(strings: &[u8], offset: u32) -> String {
    let relative = offset as usize - HEADER_SIZE;
    let end = strings[relative..]
        .iter()
        .position(|&byte| byte == 0)
        .unwrap();
    String::from_utf8(strings[relative..relative + end].to_vec()).unwrap()
}

/// A process-unique scratch directory, removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(label: &str) -> ScratchDir {
        let path = std::env::temp_dir().join(format!(
            "typescope-{label}-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&path).unwrap();
        ScratchDir { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a finished buffer as `<namespace>-<version>.typelib`.
    pub fn write_typelib(&self, namespace: &str, version: &str, data: &[u8]) -> PathBuf {
        let path = self.path.join(format!("{namespace}-{version}.typelib"));
        std::fs::write(&path, data).unwrap();
        path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Inline descriptor helpers shared by the integration tests.
pub mod ty {
    use typescope::schema::{SimpleType, TypeTag};

    pub fn void() -> u32 {
        SimpleType::inline(TypeTag::Void, false).0
    }

    pub fn boolean() -> u32 {
        SimpleType::inline(TypeTag::Boolean, false).0
    }

    pub fn int32() -> u32 {
        SimpleType::inline(TypeTag::Int32, false).0
    }

    pub fn uint32() -> u32 {
        SimpleType::inline(TypeTag::UInt32, false).0
    }

    pub fn double() -> u32 {
        SimpleType::inline(TypeTag::Double, false).0
    }

    pub fn utf8() -> u32 {
        SimpleType::inline(TypeTag::Utf8, true).0
    }
}
