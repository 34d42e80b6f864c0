//! Entity blob layouts.
//!
//! One parsed-view struct per blob kind. Each struct mirrors the on-disk
//! record field by field: a `SIZE` constant for the fixed prefix and a
//! bounds-checked `read`. Variable-length trailing arrays are *not* consumed
//! here - their positions are computed by [`crate::schema::layout`] so that the
//! validator and the accessor layer cannot drift apart.
//!
//! Pure flag words are typed with `bitflags`; words that pack flags together
//! with a small integer (function vfunc index, enum storage type, argument
//! scope) stay raw with decoding methods.

use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::{
    file::io::{read_ne, read_ne_at},
    schema::types::{SimpleType, TypeTag},
    Result,
};

bitflags! {
    /// Flags shared by every top-level blob that only records deprecation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CommonFlags: u16 {
        /// Entity is deprecated
        const DEPRECATED = 1 << 0;
    }
}

bitflags! {
    /// Field access flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FieldFlags: u8 {
        /// Field may be read
        const READABLE = 1 << 0;
        /// Field may be written
        const WRITABLE = 1 << 1;
        /// An inline callback blob follows this field record
        const HAS_EMBEDDED_TYPE = 1 << 2;
    }
}

bitflags! {
    /// Property behavior flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PropertyFlags: u32 {
        /// Property is deprecated
        const DEPRECATED = 1 << 0;
        /// Property may be read
        const READABLE = 1 << 1;
        /// Property may be written
        const WRITABLE = 1 << 2;
        /// Property may be set at construction
        const CONSTRUCT = 1 << 3;
        /// Property may only be set at construction
        const CONSTRUCT_ONLY = 1 << 4;
        /// Caller receives ownership of the value
        const TRANSFER_OWNERSHIP = 1 << 5;
        /// Caller receives ownership of the container only
        const TRANSFER_CONTAINER = 1 << 6;
        /// The `setter` method index is meaningful
        const HAS_SETTER = 1 << 7;
        /// The `getter` method index is meaningful
        const HAS_GETTER = 1 << 8;
    }
}

bitflags! {
    /// Signal emission flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SignalFlags: u16 {
        /// Signal is deprecated
        const DEPRECATED = 1 << 0;
        /// Default handler runs first
        const RUN_FIRST = 1 << 1;
        /// Default handler runs last
        const RUN_LAST = 1 << 2;
        /// Default handler runs at cleanup
        const RUN_CLEANUP = 1 << 3;
        /// Re-emission during emission is blocked
        const NO_RECURSE = 1 << 4;
        /// Signal supports detail strings
        const DETAILED = 1 << 5;
        /// Signal is an action signal
        const ACTION = 1 << 6;
        /// Emission hooks are not supported
        const NO_HOOKS = 1 << 7;
        /// The `class_closure` vfunc index is meaningful
        const HAS_CLASS_CLOSURE = 1 << 8;
        /// A true return value stops emission
        const TRUE_STOPS_EMIT = 1 << 9;
    }
}

bitflags! {
    /// Virtual function flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VFuncFlags: u16 {
        /// Implementations must chain up
        const MUST_CHAIN_UP = 1 << 0;
        /// Subclasses must implement this vfunc
        const MUST_BE_IMPLEMENTED = 1 << 1;
        /// Subclasses must not implement this vfunc
        const MUST_NOT_BE_IMPLEMENTED = 1 << 2;
        /// The `signal` index names the signal this vfunc is the class closure for
        const CLASS_CLOSURE = 1 << 3;
        /// VFunc can raise an error
        const THROWS = 1 << 4;
    }
}

bitflags! {
    /// Signature-level flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SignatureFlags: u16 {
        /// Return value may be null
        const MAY_RETURN_NULL = 1 << 0;
        /// Caller owns the returned value
        const CALLER_OWNS_RETURN_VALUE = 1 << 1;
        /// Caller owns the returned container only
        const CALLER_OWNS_RETURN_CONTAINER = 1 << 2;
        /// Bindings should skip the return value
        const SKIP_RETURN = 1 << 3;
        /// Ownership of the instance is transferred
        const INSTANCE_TRANSFER = 1 << 4;
        /// Callable takes a trailing error out-argument
        const THROWS = 1 << 5;
    }
}

bitflags! {
    /// Struct/boxed flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StructFlags: u16 {
        /// Struct is deprecated
        const DEPRECATED = 1 << 0;
        /// No runtime type is registered
        const UNREGISTERED = 1 << 1;
        /// Struct is the class/iface struct of an object or interface
        const IS_GTYPE_STRUCT = 1 << 2;
        /// Struct is defined by a foreign binding layer
        const FOREIGN = 1 << 3;
        /// Struct is referenced through a pointer
        const POINTER = 1 << 4;
    }
}

bitflags! {
    /// Object flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ObjectFlags: u16 {
        /// Object is deprecated
        const DEPRECATED = 1 << 0;
        /// Object cannot be instantiated
        const ABSTRACT = 1 << 1;
        /// Object is a fundamental type with custom ref/unref
        const FUNDAMENTAL = 1 << 2;
        /// Object cannot be subclassed
        const FINAL = 1 << 3;
    }
}

bitflags! {
    /// Union flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct UnionFlags: u16 {
        /// Union is deprecated
        const DEPRECATED = 1 << 0;
        /// No runtime type is registered
        const UNREGISTERED = 1 << 1;
        /// Union carries discriminator information
        const DISCRIMINATED = 1 << 2;
    }
}

bitflags! {
    /// Argument direction and ownership flags (low bits of the packed word).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ArgFlags: u32 {
        /// Argument flows caller to callee
        const IN = 1 << 0;
        /// Argument flows callee to caller
        const OUT = 1 << 1;
        /// Caller must allocate the out-argument
        const CALLER_ALLOCATES = 1 << 2;
        /// Argument may be null
        const NULLABLE = 1 << 3;
        /// Out-argument may be ignored
        const OPTIONAL = 1 << 4;
        /// Ownership of the value is transferred
        const TRANSFER_OWNERSHIP = 1 << 5;
        /// Ownership of the container only is transferred
        const TRANSFER_CONTAINER = 1 << 6;
        /// Argument is the return value
        const RETURN_VALUE = 1 << 7;
        /// Bindings should skip this argument
        const SKIP = 1 << 11;
    }
}

/// Lifetime of a callback argument's closure.
#[derive(Clone, Copy, Debug, Display, FromRepr, PartialEq, Eq)]
#[repr(u8)]
pub enum ScopeKind {
    /// Not a callback argument
    Invalid = 0,
    /// Valid for the duration of the call
    Call = 1,
    /// Valid until the async callback fires
    Async = 2,
    /// Valid until the destroy notifier runs
    Notified = 3,
    /// Valid for the rest of the process lifetime
    Forever = 4,
}

/// Function blob, 20 bytes.
#[derive(Clone, Copy, Debug)]
pub struct FunctionBlob {
    /// Blob type tag (function)
    pub blob_type: u16,
    /// Packed flags and vfunc/property index, see the accessors
    pub flags: u16,
    /// Name string offset
    pub name: u32,
    /// Exported symbol string offset
    pub symbol: u32,
    /// Signature blob offset
    pub signature: u32,
    /// Static/method flags
    pub flags2: u16,
}

impl FunctionBlob {
    /// Size of the function blob.
    pub const SIZE: usize = 20;

    /// Function is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.flags & (1 << 0) != 0
    }

    /// Function is the setter of the property named by [`Self::index`].
    pub fn is_setter(&self) -> bool {
        self.flags & (1 << 1) != 0
    }

    /// Function is the getter of the property named by [`Self::index`].
    pub fn is_getter(&self) -> bool {
        self.flags & (1 << 2) != 0
    }

    /// Function is a constructor.
    pub fn is_constructor(&self) -> bool {
        self.flags & (1 << 3) != 0
    }

    /// Function is the invoker of the vfunc named by [`Self::index`].
    pub fn wraps_vfunc(&self) -> bool {
        self.flags & (1 << 4) != 0
    }

    /// Function takes a trailing error out-argument.
    pub fn throws(&self) -> bool {
        self.flags & (1 << 5) != 0
    }

    /// Property or vfunc index, meaningful with setter/getter/wraps_vfunc.
    pub fn index(&self) -> u16 {
        self.flags >> 6
    }

    /// Function has no instance argument.
    pub fn is_static(&self) -> bool {
        self.flags2 & (1 << 0) != 0
    }

    /// Function takes an instance as its first argument.
    pub fn is_method(&self) -> bool {
        self.flags2 & (1 << 1) != 0
    }

    /// Read the function blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<FunctionBlob> {
        let mut pos = offset;

        Ok(FunctionBlob {
            blob_type: read_ne_at::<u16>(data, &mut pos)?,
            flags: read_ne_at::<u16>(data, &mut pos)?,
            name: read_ne_at::<u32>(data, &mut pos)?,
            symbol: read_ne_at::<u32>(data, &mut pos)?,
            signature: read_ne_at::<u32>(data, &mut pos)?,
            flags2: read_ne_at::<u16>(data, &mut pos)?,
        })
    }
}

/// Callback blob, 12 bytes.
#[derive(Clone, Copy, Debug)]
pub struct CallbackBlob {
    /// Blob type tag (callback)
    pub blob_type: u16,
    /// Deprecation flag
    pub flags: CommonFlags,
    /// Name string offset
    pub name: u32,
    /// Signature blob offset
    pub signature: u32,
}

impl CallbackBlob {
    /// Size of the callback blob.
    pub const SIZE: usize = 12;

    /// Read the callback blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<CallbackBlob> {
        Ok(CallbackBlob {
            blob_type: read_ne::<u16>(data, offset)?,
            flags: CommonFlags::from_bits_retain(read_ne::<u16>(data, offset + 2)?),
            name: read_ne::<u32>(data, offset + 4)?,
            signature: read_ne::<u32>(data, offset + 8)?,
        })
    }
}

/// Signature blob: 8-byte prefix followed by `n_arguments` [`ArgBlob`]s.
#[derive(Clone, Copy, Debug)]
pub struct SignatureBlob {
    /// Return type descriptor
    pub return_type: SimpleType,
    /// Return/throws flags
    pub flags: SignatureFlags,
    /// Number of trailing argument blobs
    pub n_arguments: u16,
}

impl SignatureBlob {
    /// Size of the fixed signature prefix.
    pub const SIZE: usize = 8;

    /// Read the signature prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<SignatureBlob> {
        Ok(SignatureBlob {
            return_type: SimpleType::read(data, offset)?,
            flags: SignatureFlags::from_bits_retain(read_ne::<u16>(data, offset + 4)?),
            n_arguments: read_ne::<u16>(data, offset + 6)?,
        })
    }

    /// Offset of the Nth argument blob. Shared by validator and accessors.
    pub fn arg_offset(signature_offset: usize, n: usize) -> usize {
        signature_offset + Self::SIZE + n * ArgBlob::SIZE
    }
}

/// Argument blob, 16 bytes.
#[derive(Clone, Copy, Debug)]
pub struct ArgBlob {
    /// Name string offset
    pub name: u32,
    /// Raw packed flags word; [`Self::flags`] and [`Self::scope`] decode it
    pub raw_flags: u32,
    /// Index of the user-data argument for callback arguments, or -1
    pub closure: i8,
    /// Index of the destroy-notify argument for callback arguments, or -1
    pub destroy: i8,
    /// Argument type descriptor
    pub arg_type: SimpleType,
}

impl ArgBlob {
    /// Size of the argument blob.
    pub const SIZE: usize = 16;

    const SCOPE_SHIFT: u32 = 8;
    const SCOPE_MASK: u32 = 0x7;

    /// Direction and ownership flags.
    pub fn flags(&self) -> ArgFlags {
        ArgFlags::from_bits_retain(self.raw_flags)
    }

    /// Closure scope for callback arguments.
    pub fn scope(&self) -> Option<ScopeKind> {
        ScopeKind::from_repr(((self.raw_flags >> Self::SCOPE_SHIFT) & Self::SCOPE_MASK) as u8)
    }

    /// Read the argument blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ArgBlob> {
        Ok(ArgBlob {
            name: read_ne::<u32>(data, offset)?,
            raw_flags: read_ne::<u32>(data, offset + 4)?,
            closure: read_ne::<i8>(data, offset + 8)?,
            destroy: read_ne::<i8>(data, offset + 9)?,
            arg_type: SimpleType::read(data, offset + 12)?,
        })
    }
}

/// Field blob, 16 bytes; may be followed by an inline [`CallbackBlob`].
#[derive(Clone, Copy, Debug)]
pub struct FieldBlob {
    /// Name string offset
    pub name: u32,
    /// Access flags
    pub flags: FieldFlags,
    /// Bit width for bitfields, 0 otherwise
    pub bits: u8,
    /// Byte offset of the field inside the native struct
    pub struct_offset: u16,
    /// Field type descriptor (ignored when an embedded callback follows)
    pub field_type: SimpleType,
}

impl FieldBlob {
    /// Size of the field blob, excluding any embedded callback.
    pub const SIZE: usize = 16;

    /// Effective size for trailing-array walking.
    pub fn effective_size(&self) -> usize {
        if self.flags.contains(FieldFlags::HAS_EMBEDDED_TYPE) {
            Self::SIZE + CallbackBlob::SIZE
        } else {
            Self::SIZE
        }
    }

    /// Read the field blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<FieldBlob> {
        Ok(FieldBlob {
            name: read_ne::<u32>(data, offset)?,
            flags: FieldFlags::from_bits_retain(read_ne::<u8>(data, offset + 4)?),
            bits: read_ne::<u8>(data, offset + 5)?,
            struct_offset: read_ne::<u16>(data, offset + 6)?,
            field_type: SimpleType::read(data, offset + 12)?,
        })
    }
}

/// Property blob, 16 bytes.
#[derive(Clone, Copy, Debug)]
pub struct PropertyBlob {
    /// Name string offset
    pub name: u32,
    /// Behavior flags
    pub flags: PropertyFlags,
    /// Method index of the setter when `HAS_SETTER`
    pub setter: u16,
    /// Method index of the getter when `HAS_GETTER`
    pub getter: u16,
    /// Property type descriptor
    pub prop_type: SimpleType,
}

impl PropertyBlob {
    /// Size of the property blob.
    pub const SIZE: usize = 16;

    /// Read the property blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<PropertyBlob> {
        Ok(PropertyBlob {
            name: read_ne::<u32>(data, offset)?,
            flags: PropertyFlags::from_bits_retain(read_ne::<u32>(data, offset + 4)?),
            setter: read_ne::<u16>(data, offset + 8)?,
            getter: read_ne::<u16>(data, offset + 10)?,
            prop_type: SimpleType::read(data, offset + 12)?,
        })
    }
}

/// Signal blob, 12 bytes.
#[derive(Clone, Copy, Debug)]
pub struct SignalBlob {
    /// Emission flags
    pub flags: SignalFlags,
    /// VFunc index of the class closure when `HAS_CLASS_CLOSURE`
    pub class_closure: u16,
    /// Name string offset
    pub name: u32,
    /// Signature blob offset
    pub signature: u32,
}

impl SignalBlob {
    /// Size of the signal blob.
    pub const SIZE: usize = 12;

    /// Read the signal blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<SignalBlob> {
        Ok(SignalBlob {
            flags: SignalFlags::from_bits_retain(read_ne::<u16>(data, offset)?),
            class_closure: read_ne::<u16>(data, offset + 2)?,
            name: read_ne::<u32>(data, offset + 4)?,
            signature: read_ne::<u32>(data, offset + 8)?,
        })
    }
}

/// Virtual function blob, 16 bytes.
#[derive(Clone, Copy, Debug)]
pub struct VFuncBlob {
    /// Name string offset
    pub name: u32,
    /// VFunc flags
    pub flags: VFuncFlags,
    /// Signal index when `CLASS_CLOSURE`
    pub signal: u16,
    /// Byte offset of the function pointer inside the class struct
    pub struct_offset: u16,
    /// 1-based method index of the invoker function, or 0
    pub invoker: u16,
    /// Signature blob offset
    pub signature: u32,
}

impl VFuncBlob {
    /// Size of the vfunc blob.
    pub const SIZE: usize = 16;

    /// Read the vfunc blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<VFuncBlob> {
        Ok(VFuncBlob {
            name: read_ne::<u32>(data, offset)?,
            flags: VFuncFlags::from_bits_retain(read_ne::<u16>(data, offset + 4)?),
            signal: read_ne::<u16>(data, offset + 6)?,
            struct_offset: read_ne::<u16>(data, offset + 8)?,
            invoker: read_ne::<u16>(data, offset + 10)?,
            signature: read_ne::<u32>(data, offset + 12)?,
        })
    }
}

/// Enum value blob, 12 bytes.
#[derive(Clone, Copy, Debug)]
pub struct ValueBlob {
    /// Deprecation and signedness flags (bit 0 deprecated, bit 1 unsigned)
    pub flags: u32,
    /// Name string offset
    pub name: u32,
    /// The value, sign-extended; consult [`Self::is_unsigned`] for values
    /// above `i32::MAX`
    pub value: i32,
}

impl ValueBlob {
    /// Size of the value blob.
    pub const SIZE: usize = 12;

    /// Value is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.flags & (1 << 0) != 0
    }

    /// The stored bits represent an unsigned value.
    pub fn is_unsigned(&self) -> bool {
        self.flags & (1 << 1) != 0
    }

    /// Read the value blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ValueBlob> {
        Ok(ValueBlob {
            flags: read_ne::<u32>(data, offset)?,
            name: read_ne::<u32>(data, offset + 4)?,
            value: read_ne::<i32>(data, offset + 8)?,
        })
    }
}

/// Constant blob, 20 bytes. The literal bytes live at `offset`/`size`.
#[derive(Clone, Copy, Debug)]
pub struct ConstantBlob {
    /// Blob type tag (constant)
    pub blob_type: u16,
    /// Deprecation flag
    pub flags: CommonFlags,
    /// Name string offset
    pub name: u32,
    /// Value type descriptor
    pub const_type: SimpleType,
    /// Byte length of the literal
    pub size: u32,
    /// Offset of the literal bytes
    pub offset: u32,
}

impl ConstantBlob {
    /// Size of the constant blob.
    pub const SIZE: usize = 20;

    /// Read the constant blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ConstantBlob> {
        Ok(ConstantBlob {
            blob_type: read_ne::<u16>(data, offset)?,
            flags: CommonFlags::from_bits_retain(read_ne::<u16>(data, offset + 2)?),
            name: read_ne::<u32>(data, offset + 4)?,
            const_type: SimpleType::read(data, offset + 8)?,
            size: read_ne::<u32>(data, offset + 12)?,
            offset: read_ne::<u32>(data, offset + 16)?,
        })
    }
}

/// Enum/flags blob: 24-byte prefix, then `n_values` [`ValueBlob`]s, then
/// `n_methods` [`FunctionBlob`]s.
#[derive(Clone, Copy, Debug)]
pub struct EnumBlob {
    /// Blob type tag (enum or flags)
    pub blob_type: u16,
    /// Packed deprecated/unregistered/storage bits
    pub flags: u16,
    /// Name string offset
    pub name: u32,
    /// Runtime type name string offset, or 0
    pub gtype_name: u32,
    /// Runtime type init symbol string offset, or 0
    pub gtype_init: u32,
    /// Number of trailing value blobs
    pub n_values: u16,
    /// Number of trailing method blobs
    pub n_methods: u16,
    /// Error domain string offset, or 0
    pub error_domain: u32,
}

impl EnumBlob {
    /// Size of the fixed enum prefix.
    pub const SIZE: usize = 24;

    /// Enum is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.flags & (1 << 0) != 0
    }

    /// No runtime type is registered for this enum.
    pub fn is_unregistered(&self) -> bool {
        self.flags & (1 << 1) != 0
    }

    /// Integer type the enum is stored as.
    pub fn storage_type(&self) -> Option<TypeTag> {
        TypeTag::from_repr(((self.flags >> 2) & 0x1F) as u8)
    }

    /// Read the enum prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<EnumBlob> {
        let mut pos = offset;

        Ok(EnumBlob {
            blob_type: read_ne_at::<u16>(data, &mut pos)?,
            flags: read_ne_at::<u16>(data, &mut pos)?,
            name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_init: read_ne_at::<u32>(data, &mut pos)?,
            n_values: read_ne_at::<u16>(data, &mut pos)?,
            n_methods: read_ne_at::<u16>(data, &mut pos)?,
            error_domain: read_ne_at::<u32>(data, &mut pos)?,
        })
    }
}

/// Struct/boxed blob: 32-byte prefix, then fields (embedded callbacks
/// included), then methods.
#[derive(Clone, Copy, Debug)]
pub struct StructBlob {
    /// Blob type tag (struct or boxed)
    pub blob_type: u16,
    /// Struct flags
    pub flags: StructFlags,
    /// Name string offset
    pub name: u32,
    /// Runtime type name string offset, or 0
    pub gtype_name: u32,
    /// Runtime type init symbol string offset, or 0
    pub gtype_init: u32,
    /// Size of the native struct in bytes
    pub size: u32,
    /// Number of trailing field blobs
    pub n_fields: u16,
    /// Number of trailing method blobs
    pub n_methods: u16,
    /// Copy function symbol string offset, or 0
    pub copy_func: u32,
    /// Free function symbol string offset, or 0
    pub free_func: u32,
}

impl StructBlob {
    /// Size of the fixed struct prefix.
    pub const SIZE: usize = 32;

    /// Read the struct prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<StructBlob> {
        let mut pos = offset;

        Ok(StructBlob {
            blob_type: read_ne_at::<u16>(data, &mut pos)?,
            flags: StructFlags::from_bits_retain(read_ne_at::<u16>(data, &mut pos)?),
            name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_init: read_ne_at::<u32>(data, &mut pos)?,
            size: read_ne_at::<u32>(data, &mut pos)?,
            n_fields: read_ne_at::<u16>(data, &mut pos)?,
            n_methods: read_ne_at::<u16>(data, &mut pos)?,
            copy_func: read_ne_at::<u32>(data, &mut pos)?,
            free_func: read_ne_at::<u32>(data, &mut pos)?,
        })
    }
}

/// Object blob: 60-byte prefix, then interfaces (even-padded u16 indices),
/// fields, properties, methods, signals, vfuncs, constants.
#[derive(Clone, Copy, Debug)]
pub struct ObjectBlob {
    /// Blob type tag (object)
    pub blob_type: u16,
    /// Object flags
    pub flags: ObjectFlags,
    /// Name string offset
    pub name: u32,
    /// Runtime type name string offset
    pub gtype_name: u32,
    /// Runtime type init symbol string offset
    pub gtype_init: u32,
    /// 1-based directory index of the parent object, or 0
    pub parent: u16,
    /// 1-based directory index of the class struct, or 0
    pub gtype_struct: u16,
    /// Number of implemented interfaces
    pub n_interfaces: u16,
    /// Number of trailing field blobs
    pub n_fields: u16,
    /// Number of trailing property blobs
    pub n_properties: u16,
    /// Number of trailing method blobs
    pub n_methods: u16,
    /// Number of trailing signal blobs
    pub n_signals: u16,
    /// Number of trailing vfunc blobs
    pub n_vfuncs: u16,
    /// Number of trailing constant blobs
    pub n_constants: u16,
    /// Number of fields with embedded callbacks (for size accounting)
    pub n_field_callbacks: u16,
    /// Ref function symbol string offset for fundamental types, or 0
    pub ref_func: u32,
    /// Unref function symbol string offset for fundamental types, or 0
    pub unref_func: u32,
    /// Value-setter symbol string offset for fundamental types, or 0
    pub set_value_func: u32,
    /// Value-getter symbol string offset for fundamental types, or 0
    pub get_value_func: u32,
}

impl ObjectBlob {
    /// Size of the fixed object prefix.
    pub const SIZE: usize = 60;

    /// Read the object prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<ObjectBlob> {
        let mut pos = offset;

        Ok(ObjectBlob {
            blob_type: read_ne_at::<u16>(data, &mut pos)?,
            flags: ObjectFlags::from_bits_retain(read_ne_at::<u16>(data, &mut pos)?),
            name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_init: read_ne_at::<u32>(data, &mut pos)?,
            parent: read_ne_at::<u16>(data, &mut pos)?,
            gtype_struct: read_ne_at::<u16>(data, &mut pos)?,
            n_interfaces: read_ne_at::<u16>(data, &mut pos)?,
            n_fields: read_ne_at::<u16>(data, &mut pos)?,
            n_properties: read_ne_at::<u16>(data, &mut pos)?,
            n_methods: read_ne_at::<u16>(data, &mut pos)?,
            n_signals: read_ne_at::<u16>(data, &mut pos)?,
            n_vfuncs: read_ne_at::<u16>(data, &mut pos)?,
            n_constants: read_ne_at::<u16>(data, &mut pos)?,
            n_field_callbacks: read_ne_at::<u16>(data, &mut pos)?,
            ref_func: read_ne_at::<u32>(data, &mut pos)?,
            unref_func: read_ne_at::<u32>(data, &mut pos)?,
            set_value_func: read_ne_at::<u32>(data, &mut pos)?,
            get_value_func: read_ne_at::<u32>(data, &mut pos)?,
        })
    }
}

/// Interface blob: 40-byte prefix, then prerequisites (even-padded u16
/// indices), properties, methods, signals, vfuncs, constants.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceBlob {
    /// Blob type tag (interface)
    pub blob_type: u16,
    /// Deprecation flag
    pub flags: CommonFlags,
    /// Name string offset
    pub name: u32,
    /// Runtime type name string offset
    pub gtype_name: u32,
    /// Runtime type init symbol string offset
    pub gtype_init: u32,
    /// 1-based directory index of the iface struct, or 0
    pub gtype_struct: u16,
    /// Number of prerequisite entries
    pub n_prerequisites: u16,
    /// Number of trailing property blobs
    pub n_properties: u16,
    /// Number of trailing method blobs
    pub n_methods: u16,
    /// Number of trailing signal blobs
    pub n_signals: u16,
    /// Number of trailing vfunc blobs
    pub n_vfuncs: u16,
    /// Number of trailing constant blobs
    pub n_constants: u16,
}

impl InterfaceBlob {
    /// Size of the fixed interface prefix.
    pub const SIZE: usize = 40;

    /// Read the interface prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<InterfaceBlob> {
        let mut pos = offset;

        Ok(InterfaceBlob {
            blob_type: read_ne_at::<u16>(data, &mut pos)?,
            flags: CommonFlags::from_bits_retain(read_ne_at::<u16>(data, &mut pos)?),
            name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_init: read_ne_at::<u32>(data, &mut pos)?,
            gtype_struct: read_ne_at::<u16>(data, &mut pos)?,
            n_prerequisites: read_ne_at::<u16>(data, &mut pos)?,
            n_properties: read_ne_at::<u16>(data, &mut pos)?,
            n_methods: read_ne_at::<u16>(data, &mut pos)?,
            n_signals: read_ne_at::<u16>(data, &mut pos)?,
            n_vfuncs: read_ne_at::<u16>(data, &mut pos)?,
            n_constants: read_ne_at::<u16>(data, &mut pos)?,
        })
    }
}

/// Union blob: 40-byte prefix, then fields, functions, and (when
/// discriminated) one discriminator constant per field.
#[derive(Clone, Copy, Debug)]
pub struct UnionBlob {
    /// Blob type tag (union)
    pub blob_type: u16,
    /// Union flags
    pub flags: UnionFlags,
    /// Name string offset
    pub name: u32,
    /// Runtime type name string offset, or 0
    pub gtype_name: u32,
    /// Runtime type init symbol string offset, or 0
    pub gtype_init: u32,
    /// Size of the native union in bytes
    pub size: u32,
    /// Number of trailing field blobs
    pub n_fields: u16,
    /// Number of trailing function blobs
    pub n_functions: u16,
    /// Copy function symbol string offset, or 0
    pub copy_func: u32,
    /// Free function symbol string offset, or 0
    pub free_func: u32,
    /// Byte offset of the discriminator inside the native union
    pub discriminator_offset: i32,
    /// Discriminator type descriptor
    pub discriminator_type: SimpleType,
}

impl UnionBlob {
    /// Size of the fixed union prefix.
    pub const SIZE: usize = 40;

    /// Union carries discriminator information.
    pub fn is_discriminated(&self) -> bool {
        self.flags.contains(UnionFlags::DISCRIMINATED)
    }

    /// Read the union prefix at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<UnionBlob> {
        let mut pos = offset;

        Ok(UnionBlob {
            blob_type: read_ne_at::<u16>(data, &mut pos)?,
            flags: UnionFlags::from_bits_retain(read_ne_at::<u16>(data, &mut pos)?),
            name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_name: read_ne_at::<u32>(data, &mut pos)?,
            gtype_init: read_ne_at::<u32>(data, &mut pos)?,
            size: read_ne_at::<u32>(data, &mut pos)?,
            n_fields: read_ne_at::<u16>(data, &mut pos)?,
            n_functions: read_ne_at::<u16>(data, &mut pos)?,
            copy_func: read_ne_at::<u32>(data, &mut pos)?,
            free_func: read_ne_at::<u32>(data, &mut pos)?,
            discriminator_offset: read_ne_at::<i32>(data, &mut pos)?,
            discriminator_type: SimpleType(read_ne_at::<u32>(data, &mut pos)?),
        })
    }
}

/// Attribute record, 12 bytes: (target blob offset, name, value).
///
/// The attribute table is sorted ascending by `offset` and searched by
/// binary search; the validator enforces the ordering.
#[derive(Clone, Copy, Debug)]
pub struct AttributeBlob {
    /// Byte offset of the blob this attribute annotates
    pub offset: u32,
    /// Name string offset
    pub name: u32,
    /// Value string offset
    pub value: u32,
}

impl AttributeBlob {
    /// Size of the attribute record.
    pub const SIZE: usize = 12;

    /// Read the attribute record at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<AttributeBlob> {
        Ok(AttributeBlob {
            offset: read_ne::<u32>(data, offset)?,
            name: read_ne::<u32>(data, offset + 4)?,
            value: read_ne::<u32>(data, offset + 8)?,
        })
    }
}
