//! Trailing-array arithmetic for container blobs.
//!
//! Enum, struct, object, interface and union blobs are followed by ordered
//! variable-length sections. Field arrays are the awkward case: a field with
//! `HAS_EMBEDDED_TYPE` set is followed inline by a callback blob, so field
//! positions can only be found by walking. Index arrays (implemented
//! interfaces, prerequisites) are u16 directory indices padded to an even
//! count so the next section stays 4-aligned.
//!
//! The validator and the accessor layer both go through the functions here;
//! they must never compute a position independently.

use crate::{
    schema::blobs::{
        ArgBlob, ConstantBlob, EnumBlob, FieldBlob, FunctionBlob, InterfaceBlob, ObjectBlob,
        PropertyBlob, SignalBlob, SignatureBlob, StructBlob, UnionBlob, VFuncBlob, ValueBlob,
    },
    Error, Result,
};

/// Byte size of an even-padded u16 index array.
pub fn padded_index_array_size(count: usize) -> usize {
    // round the u16 count up to an even number
    count.div_ceil(2) * 2 * 2
}

/// Offset of the Nth record in a fixed-stride section.
///
/// # Errors
/// Returns [`Error::IndexOutOfRange`] when `index >= count`.
pub fn nth_fixed(section: usize, stride: usize, count: usize, index: usize) -> Result<usize> {
    if index >= count {
        return Err(Error::IndexOutOfRange { index, count });
    }
    Ok(section + index * stride)
}

/// Offset of the Nth field in a field array, skipping embedded callbacks.
///
/// # Errors
/// Returns [`Error::IndexOutOfRange`] when `index >= count`, or
/// [`Error::OutOfBounds`] if the walk leaves the buffer.
pub fn nth_field(data: &[u8], section: usize, count: usize, index: usize) -> Result<usize> {
    if index >= count {
        return Err(Error::IndexOutOfRange { index, count });
    }

    let mut pos = section;
    for _ in 0..index {
        pos += FieldBlob::read(data, pos)?.effective_size();
    }
    Ok(pos)
}

/// End offset of a field array, embedded callbacks included.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if the walk leaves the buffer.
pub fn fields_end(data: &[u8], section: usize, count: usize) -> Result<usize> {
    let mut pos = section;
    for _ in 0..count {
        pos += FieldBlob::read(data, pos)?.effective_size();
    }
    Ok(pos)
}

/// End offset of a signature blob (prefix plus argument array).
pub fn signature_end(signature_offset: usize, n_arguments: usize) -> usize {
    signature_offset + SignatureBlob::SIZE + n_arguments * ArgBlob::SIZE
}

/// Section offsets of an enum blob's trailing arrays.
#[derive(Clone, Copy, Debug)]
pub struct EnumLayout {
    /// Start of the value array
    pub values: usize,
    /// Start of the method array
    pub methods: usize,
    /// One past the last method
    pub end: usize,
}

impl EnumLayout {
    /// Compute the layout of the enum blob at `offset`.
    pub fn compute(offset: usize, blob: &EnumBlob) -> EnumLayout {
        let values = offset + EnumBlob::SIZE;
        let methods = values + usize::from(blob.n_values) * ValueBlob::SIZE;
        let end = methods + usize::from(blob.n_methods) * FunctionBlob::SIZE;
        EnumLayout { values, methods, end }
    }
}

/// Section offsets of a struct/boxed blob's trailing arrays.
#[derive(Clone, Copy, Debug)]
pub struct StructLayout {
    /// Start of the field array
    pub fields: usize,
    /// Start of the method array
    pub methods: usize,
    /// One past the last method
    pub end: usize,
}

impl StructLayout {
    /// Compute the layout of the struct blob at `offset`. Walks the field
    /// array, so the buffer must cover it.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the field walk leaves the buffer.
    pub fn compute(data: &[u8], offset: usize, blob: &StructBlob) -> Result<StructLayout> {
        let fields = offset + StructBlob::SIZE;
        let methods = fields_end(data, fields, usize::from(blob.n_fields))?;
        let end = methods + usize::from(blob.n_methods) * FunctionBlob::SIZE;
        Ok(StructLayout { fields, methods, end })
    }
}

/// Section offsets of an object blob's trailing arrays.
#[derive(Clone, Copy, Debug)]
pub struct ObjectLayout {
    /// Start of the implemented-interface index array
    pub interfaces: usize,
    /// Start of the field array
    pub fields: usize,
    /// Start of the property array
    pub properties: usize,
    /// Start of the method array
    pub methods: usize,
    /// Start of the signal array
    pub signals: usize,
    /// Start of the vfunc array
    pub vfuncs: usize,
    /// Start of the constant array
    pub constants: usize,
    /// One past the last constant
    pub end: usize,
}

impl ObjectLayout {
    /// Compute the layout of the object blob at `offset`. Walks the field
    /// array, so the buffer must cover it.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the field walk leaves the buffer.
    pub fn compute(data: &[u8], offset: usize, blob: &ObjectBlob) -> Result<ObjectLayout> {
        let interfaces = offset + ObjectBlob::SIZE;
        let fields = interfaces + padded_index_array_size(usize::from(blob.n_interfaces));
        let properties = fields_end(data, fields, usize::from(blob.n_fields))?;
        let methods = properties + usize::from(blob.n_properties) * PropertyBlob::SIZE;
        let signals = methods + usize::from(blob.n_methods) * FunctionBlob::SIZE;
        let vfuncs = signals + usize::from(blob.n_signals) * SignalBlob::SIZE;
        let constants = vfuncs + usize::from(blob.n_vfuncs) * VFuncBlob::SIZE;
        let end = constants + usize::from(blob.n_constants) * ConstantBlob::SIZE;

        Ok(ObjectLayout {
            interfaces,
            fields,
            properties,
            methods,
            signals,
            vfuncs,
            constants,
            end,
        })
    }
}

/// Section offsets of an interface blob's trailing arrays.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceLayout {
    /// Start of the prerequisite index array
    pub prerequisites: usize,
    /// Start of the property array
    pub properties: usize,
    /// Start of the method array
    pub methods: usize,
    /// Start of the signal array
    pub signals: usize,
    /// Start of the vfunc array
    pub vfuncs: usize,
    /// Start of the constant array
    pub constants: usize,
    /// One past the last constant
    pub end: usize,
}

impl InterfaceLayout {
    /// Compute the layout of the interface blob at `offset`.
    pub fn compute(offset: usize, blob: &InterfaceBlob) -> InterfaceLayout {
        let prerequisites = offset + InterfaceBlob::SIZE;
        let properties =
            prerequisites + padded_index_array_size(usize::from(blob.n_prerequisites));
        let methods = properties + usize::from(blob.n_properties) * PropertyBlob::SIZE;
        let signals = methods + usize::from(blob.n_methods) * FunctionBlob::SIZE;
        let vfuncs = signals + usize::from(blob.n_signals) * SignalBlob::SIZE;
        let constants = vfuncs + usize::from(blob.n_vfuncs) * VFuncBlob::SIZE;
        let end = constants + usize::from(blob.n_constants) * ConstantBlob::SIZE;

        InterfaceLayout {
            prerequisites,
            properties,
            methods,
            signals,
            vfuncs,
            constants,
            end,
        }
    }
}

/// Section offsets of a union blob's trailing arrays.
#[derive(Clone, Copy, Debug)]
pub struct UnionLayout {
    /// Start of the field array
    pub fields: usize,
    /// Start of the function array
    pub functions: usize,
    /// Start of the discriminator constants (one per field, discriminated
    /// unions only)
    pub discriminators: usize,
    /// One past the last trailing record
    pub end: usize,
}

impl UnionLayout {
    /// Compute the layout of the union blob at `offset`. Walks the field
    /// array, so the buffer must cover it.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the field walk leaves the buffer.
    pub fn compute(data: &[u8], offset: usize, blob: &UnionBlob) -> Result<UnionLayout> {
        let fields = offset + UnionBlob::SIZE;
        let functions = fields_end(data, fields, usize::from(blob.n_fields))?;
        let discriminators = functions + usize::from(blob.n_functions) * FunctionBlob::SIZE;
        let end = if blob.is_discriminated() {
            discriminators + usize::from(blob.n_fields) * ConstantBlob::SIZE
        } else {
            discriminators
        };

        Ok(UnionLayout {
            fields,
            functions,
            discriminators,
            end,
        })
    }
}
