//! Child accessors: fields, properties, signals, vfuncs, enum values and
//! constants.

use crate::{
    file::io::read_ne,
    schema::blobs::{
        CommonFlags, ConstantBlob, FieldBlob, FieldFlags, PropertyBlob, PropertyFlags, SignalBlob,
        SignalFlags, VFuncBlob, VFuncFlags, ValueBlob,
    },
    schema::types::TypeTag,
};

use super::{CallbackInfo, InfoCore, SignatureInfo, TypeInfo};

/// A field of a struct, union or object.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub(crate) core: InfoCore,
}

impl FieldInfo {
    pub(crate) fn new(core: InfoCore) -> FieldInfo {
        FieldInfo { core }
    }

    fn blob(&self) -> FieldBlob {
        FieldBlob::read(self.core.data(), self.core.offset).unwrap_or(FieldBlob {
            name: 0,
            flags: FieldFlags::empty(),
            bits: 0,
            struct_offset: 0,
            field_type: crate::schema::SimpleType(0),
        })
    }

    /// The field name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// Whether the field may be read.
    pub fn is_readable(&self) -> bool {
        self.blob().flags.contains(FieldFlags::READABLE)
    }

    /// Whether the field may be written.
    pub fn is_writable(&self) -> bool {
        self.blob().flags.contains(FieldFlags::WRITABLE)
    }

    /// Bit width, for bitfield members.
    pub fn bits(&self) -> Option<u8> {
        let bits = self.blob().bits;
        (bits != 0).then_some(bits)
    }

    /// Byte offset of the field inside the native struct.
    pub fn offset(&self) -> u16 {
        self.blob().struct_offset
    }

    /// The field type, unless the field embeds a callback.
    pub fn type_info(&self) -> Option<TypeInfo> {
        if self.blob().flags.contains(FieldFlags::HAS_EMBEDDED_TYPE) {
            return None;
        }
        Some(TypeInfo::new(self.core.at(self.core.offset + 12)))
    }

    /// The embedded callback, for function pointer fields.
    pub fn embedded_callback(&self) -> Option<CallbackInfo> {
        if !self.blob().flags.contains(FieldFlags::HAS_EMBEDDED_TYPE) {
            return None;
        }
        Some(CallbackInfo::new(self.core.at(self.core.offset + FieldBlob::SIZE)))
    }
}

/// A property of an object or interface.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyInfo {
    pub(crate) core: InfoCore,
}

impl PropertyInfo {
    pub(crate) fn new(core: InfoCore) -> PropertyInfo {
        PropertyInfo { core }
    }

    fn blob(&self) -> PropertyBlob {
        PropertyBlob::read(self.core.data(), self.core.offset).unwrap_or(PropertyBlob {
            name: 0,
            flags: PropertyFlags::empty(),
            setter: 0,
            getter: 0,
            prop_type: crate::schema::SimpleType(0),
        })
    }

    /// The property name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The raw behavior flags.
    pub fn flags(&self) -> PropertyFlags {
        self.blob().flags
    }

    /// Whether the property is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(PropertyFlags::DEPRECATED)
    }

    /// Whether the property may be read.
    pub fn is_readable(&self) -> bool {
        self.blob().flags.contains(PropertyFlags::READABLE)
    }

    /// Whether the property may be written.
    pub fn is_writable(&self) -> bool {
        self.blob().flags.contains(PropertyFlags::WRITABLE)
    }

    /// Method index of the setter, when one is recorded.
    pub fn setter_index(&self) -> Option<u16> {
        let blob = self.blob();
        blob.flags
            .contains(PropertyFlags::HAS_SETTER)
            .then_some(blob.setter)
    }

    /// Method index of the getter, when one is recorded.
    pub fn getter_index(&self) -> Option<u16> {
        let blob = self.blob();
        blob.flags
            .contains(PropertyFlags::HAS_GETTER)
            .then_some(blob.getter)
    }

    /// The property type.
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::new(self.core.at(self.core.offset + 12))
    }
}

/// A signal of an object or interface.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalInfo {
    pub(crate) core: InfoCore,
}

impl SignalInfo {
    pub(crate) fn new(core: InfoCore) -> SignalInfo {
        SignalInfo { core }
    }

    fn blob(&self) -> SignalBlob {
        SignalBlob::read(self.core.data(), self.core.offset).unwrap_or(SignalBlob {
            flags: SignalFlags::empty(),
            class_closure: 0,
            name: 0,
            signature: 0,
        })
    }

    /// The signal name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The raw emission flags.
    pub fn flags(&self) -> SignalFlags {
        self.blob().flags
    }

    /// VFunc index of the class closure, when one is recorded.
    pub fn class_closure_index(&self) -> Option<u16> {
        let blob = self.blob();
        blob.flags
            .contains(SignalFlags::HAS_CLASS_CLOSURE)
            .then_some(blob.class_closure)
    }

    /// Whether a true return value stops emission.
    pub fn true_stops_emit(&self) -> bool {
        self.blob().flags.contains(SignalFlags::TRUE_STOPS_EMIT)
    }

    /// The handler signature.
    pub fn signature(&self) -> SignatureInfo {
        SignatureInfo::new(self.core.at(self.blob().signature as usize))
    }
}

/// A virtual function of an object or interface.
#[derive(Clone, Debug, PartialEq)]
pub struct VFuncInfo {
    pub(crate) core: InfoCore,
}

impl VFuncInfo {
    pub(crate) fn new(core: InfoCore) -> VFuncInfo {
        VFuncInfo { core }
    }

    fn blob(&self) -> VFuncBlob {
        VFuncBlob::read(self.core.data(), self.core.offset).unwrap_or(VFuncBlob {
            name: 0,
            flags: VFuncFlags::empty(),
            signal: 0,
            struct_offset: 0,
            invoker: 0,
            signature: 0,
        })
    }

    /// The vfunc name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The raw vfunc flags.
    pub fn flags(&self) -> VFuncFlags {
        self.blob().flags
    }

    /// Byte offset of the function pointer inside the class struct.
    pub fn offset(&self) -> u16 {
        self.blob().struct_offset
    }

    /// 1-based method index of the invoker function, when one exists.
    pub fn invoker_index(&self) -> Option<u16> {
        let invoker = self.blob().invoker;
        (invoker != 0).then_some(invoker)
    }

    /// The vfunc signature.
    pub fn signature(&self) -> SignatureInfo {
        SignatureInfo::new(self.core.at(self.blob().signature as usize))
    }
}

/// One value of an enum or flags type.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueInfo {
    pub(crate) core: InfoCore,
}

impl ValueInfo {
    pub(crate) fn new(core: InfoCore) -> ValueInfo {
        ValueInfo { core }
    }

    fn blob(&self) -> ValueBlob {
        ValueBlob::read(self.core.data(), self.core.offset).unwrap_or(ValueBlob {
            flags: 0,
            name: 0,
            value: 0,
        })
    }

    /// The value name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// Whether the value is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().is_deprecated()
    }

    /// The numeric value, widened to `i64`. Unsigned 32-bit values above
    /// `i32::MAX` are recovered through the unsigned flag.
    pub fn value(&self) -> i64 {
        let blob = self.blob();
        if blob.is_unsigned() {
            i64::from(blob.value as u32)
        } else {
            i64::from(blob.value)
        }
    }
}

/// A typed constant literal.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    /// Boolean literal
    Boolean(bool),
    /// Signed integer literal, widened
    Int(i64),
    /// Unsigned integer literal, widened
    UInt(u64),
    /// Floating point literal, widened
    Double(f64),
    /// String literal
    String(String),
    /// Unicode code point literal
    UniChar(char),
}

/// A typed constant of a namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantInfo {
    pub(crate) core: InfoCore,
}

impl ConstantInfo {
    pub(crate) fn new(core: InfoCore) -> ConstantInfo {
        ConstantInfo { core }
    }

    fn blob(&self) -> ConstantBlob {
        ConstantBlob::read(self.core.data(), self.core.offset).unwrap_or(ConstantBlob {
            blob_type: 0,
            flags: CommonFlags::empty(),
            name: 0,
            const_type: crate::schema::SimpleType(0),
            size: 0,
            offset: 0,
        })
    }

    /// The constant name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// Whether the constant is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(CommonFlags::DEPRECATED)
    }

    /// The declared value type.
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::new(self.core.at(self.core.offset + 8))
    }

    /// The raw literal bytes.
    pub fn raw_value(&self) -> &[u8] {
        let blob = self.blob();
        self.core
            .data()
            .get(blob.offset as usize..blob.offset as usize + blob.size as usize)
            .unwrap_or_default()
    }

    /// Decode the literal according to its declared type.
    ///
    /// Returns `None` for types without a literal representation; cannot
    /// happen on a validated buffer.
    pub fn value(&self) -> Option<ConstantValue> {
        let blob = self.blob();
        let data = self.core.data();
        let offset = blob.offset as usize;

        Some(match blob.const_type.inline_tag()? {
            TypeTag::Boolean => ConstantValue::Boolean(read_ne::<u32>(data, offset).ok()? != 0),
            TypeTag::Int8 => ConstantValue::Int(read_ne::<i8>(data, offset).ok()?.into()),
            TypeTag::Int16 => ConstantValue::Int(read_ne::<i16>(data, offset).ok()?.into()),
            TypeTag::Int32 => ConstantValue::Int(read_ne::<i32>(data, offset).ok()?.into()),
            TypeTag::Int64 => ConstantValue::Int(read_ne::<i64>(data, offset).ok()?),
            TypeTag::UInt8 => ConstantValue::UInt(read_ne::<u8>(data, offset).ok()?.into()),
            TypeTag::UInt16 => ConstantValue::UInt(read_ne::<u16>(data, offset).ok()?.into()),
            TypeTag::UInt32 => ConstantValue::UInt(read_ne::<u32>(data, offset).ok()?.into()),
            TypeTag::UInt64 => ConstantValue::UInt(read_ne::<u64>(data, offset).ok()?),
            TypeTag::Float => {
                ConstantValue::Double(f32::from_bits(read_ne::<u32>(data, offset).ok()?).into())
            }
            TypeTag::Double => {
                ConstantValue::Double(f64::from_bits(read_ne::<u64>(data, offset).ok()?))
            }
            TypeTag::UniChar => {
                ConstantValue::UniChar(char::from_u32(read_ne::<u32>(data, offset).ok()?)?)
            }
            TypeTag::Utf8 | TypeTag::Filename => {
                // size includes the NUL terminator
                let bytes = self.raw_value();
                let text = std::str::from_utf8(bytes.strip_suffix(&[0]).unwrap_or(bytes)).ok()?;
                ConstantValue::String(text.to_string())
            }
            _ => return None,
        })
    }
}
