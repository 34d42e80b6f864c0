//! The fixed 112-byte typelib header.
//!
//! The header is a self-description of the format: besides the magic and
//! version it records every table offset, the entry counts, and the byte size
//! of each fixed-size blob kind as compiled into the producer. Declared sizes
//! let a minor-version-newer producer extend blobs at the end while older
//! readers still refuse anything whose layout they did not compile against.

use crate::{
    file::io::{read_ne, read_ne_at},
    schema::blobs,
    schema::directory::DirEntry,
    Result,
};

/// Total size of the fixed header.
pub const HEADER_SIZE: usize = 112;

/// Declared byte sizes for every fixed-size blob kind, in header order.
///
/// `error_domain` is reserved (always 0); it survives in the layout so the
/// header stays 112 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobSizes {
    /// Directory entry size
    pub entry: u16,
    /// Function blob size
    pub function: u16,
    /// Callback blob size
    pub callback: u16,
    /// Signal blob size
    pub signal: u16,
    /// Virtual function blob size
    pub vfunc: u16,
    /// Argument blob size
    pub arg: u16,
    /// Property blob size
    pub property: u16,
    /// Field blob size
    pub field: u16,
    /// Enum value blob size
    pub value: u16,
    /// Attribute blob size
    pub attribute: u16,
    /// Constant blob size
    pub constant: u16,
    /// Reserved, must be 0
    pub error_domain: u16,
    /// Signature blob fixed-prefix size
    pub signature: u16,
    /// Enum/flags blob fixed-prefix size
    pub enum_: u16,
    /// Struct/boxed blob fixed-prefix size
    pub struct_: u16,
    /// Object blob fixed-prefix size
    pub object: u16,
    /// Interface blob fixed-prefix size
    pub interface: u16,
    /// Union blob fixed-prefix size
    pub union: u16,
}

impl BlobSizes {
    /// The sizes this implementation compiles against.
    #[rustfmt::skip]
    pub fn compiled() -> BlobSizes {
        BlobSizes {
            entry:        DirEntry::SIZE as u16,
            function:     blobs::FunctionBlob::SIZE as u16,
            callback:     blobs::CallbackBlob::SIZE as u16,
            signal:       blobs::SignalBlob::SIZE as u16,
            vfunc:        blobs::VFuncBlob::SIZE as u16,
            arg:          blobs::ArgBlob::SIZE as u16,
            property:     blobs::PropertyBlob::SIZE as u16,
            field:        blobs::FieldBlob::SIZE as u16,
            value:        blobs::ValueBlob::SIZE as u16,
            attribute:    blobs::AttributeBlob::SIZE as u16,
            constant:     blobs::ConstantBlob::SIZE as u16,
            error_domain: 0,
            signature:    blobs::SignatureBlob::SIZE as u16,
            enum_:        blobs::EnumBlob::SIZE as u16,
            struct_:      blobs::StructBlob::SIZE as u16,
            object:       blobs::ObjectBlob::SIZE as u16,
            interface:    blobs::InterfaceBlob::SIZE as u16,
            union:        blobs::UnionBlob::SIZE as u16,
        }
    }
}

/// Parsed view of the typelib header.
///
/// All `u32` table members are byte offsets from the start of the buffer;
/// string members are offsets to NUL-terminated UTF-8. An offset of 0 means
/// "absent" for the optional members (`attributes`, `dependencies`,
/// `shared_library`, `c_prefix`, `sections`).
#[derive(Clone, Debug)]
pub struct Header {
    /// Magic bytes, must equal [`crate::schema::TYPELIB_MAGIC`]
    pub magic: [u8; 16],
    /// Major format version
    pub major_version: u8,
    /// Minor format version
    pub minor_version: u8,
    /// Number of directory entries
    pub n_entries: u16,
    /// Number of leading local directory entries
    pub n_local_entries: u16,
    /// Offset of the directory
    pub directory: u32,
    /// Number of attribute records
    pub n_attributes: u32,
    /// Offset of the attribute table, or 0
    pub attributes: u32,
    /// String offset of the pipe-separated dependency list, or 0
    pub dependencies: u32,
    /// Declared total buffer size
    pub size: u32,
    /// String offset of the namespace name
    pub namespace: u32,
    /// String offset of the namespace version, `"X.Y"`
    pub nsversion: u32,
    /// String offset of the comma-separated native module list, or 0
    pub shared_library: u32,
    /// String offset of the C symbol prefix, or 0
    pub c_prefix: u32,
    /// Declared blob sizes
    pub blob_sizes: BlobSizes,
    /// Offset of the section table, or 0
    pub sections: u32,
}

impl Header {
    /// Byte offset of the `size` field inside the header. Used by tests and
    /// by the builder when patching a finished buffer.
    pub const SIZE_FIELD_OFFSET: usize = 40;

    /// Read the header from the start of `data`.
    ///
    /// Purely structural: magic/version/size checks are the validator's job.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than
    /// [`HEADER_SIZE`].
    pub fn read(data: &[u8]) -> Result<Header> {
        if data.len() < HEADER_SIZE {
            return Err(crate::Error::OutOfBounds);
        }

        let mut magic = [0u8; 16];
        magic.copy_from_slice(&data[..16]);

        let mut offset = 16;
        let major_version = read_ne_at::<u8>(data, &mut offset)?;
        let minor_version = read_ne_at::<u8>(data, &mut offset)?;
        let _reserved = read_ne_at::<u16>(data, &mut offset)?;
        let n_entries = read_ne_at::<u16>(data, &mut offset)?;
        let n_local_entries = read_ne_at::<u16>(data, &mut offset)?;
        let directory = read_ne_at::<u32>(data, &mut offset)?;
        let n_attributes = read_ne_at::<u32>(data, &mut offset)?;
        let attributes = read_ne_at::<u32>(data, &mut offset)?;
        let dependencies = read_ne_at::<u32>(data, &mut offset)?;
        let size = read_ne_at::<u32>(data, &mut offset)?;
        let namespace = read_ne_at::<u32>(data, &mut offset)?;
        let nsversion = read_ne_at::<u32>(data, &mut offset)?;
        let shared_library = read_ne_at::<u32>(data, &mut offset)?;
        let c_prefix = read_ne_at::<u32>(data, &mut offset)?;

        let blob_sizes = BlobSizes {
            entry: read_ne_at::<u16>(data, &mut offset)?,
            function: read_ne_at::<u16>(data, &mut offset)?,
            callback: read_ne_at::<u16>(data, &mut offset)?,
            signal: read_ne_at::<u16>(data, &mut offset)?,
            vfunc: read_ne_at::<u16>(data, &mut offset)?,
            arg: read_ne_at::<u16>(data, &mut offset)?,
            property: read_ne_at::<u16>(data, &mut offset)?,
            field: read_ne_at::<u16>(data, &mut offset)?,
            value: read_ne_at::<u16>(data, &mut offset)?,
            attribute: read_ne_at::<u16>(data, &mut offset)?,
            constant: read_ne_at::<u16>(data, &mut offset)?,
            error_domain: read_ne_at::<u16>(data, &mut offset)?,
            signature: read_ne_at::<u16>(data, &mut offset)?,
            enum_: read_ne_at::<u16>(data, &mut offset)?,
            struct_: read_ne_at::<u16>(data, &mut offset)?,
            object: read_ne_at::<u16>(data, &mut offset)?,
            interface: read_ne_at::<u16>(data, &mut offset)?,
            union: read_ne_at::<u16>(data, &mut offset)?,
        };

        let sections = read_ne_at::<u32>(data, &mut offset)?;

        debug_assert_eq!(offset, 100);

        Ok(Header {
            magic,
            major_version,
            minor_version,
            n_entries,
            n_local_entries,
            directory,
            n_attributes,
            attributes,
            dependencies,
            size,
            namespace,
            nsversion,
            shared_library,
            c_prefix,
            blob_sizes,
            sections,
        })
    }
}

/// One record of the section table: `{ id, offset }`, terminated by id 0.
#[derive(Clone, Copy, Debug)]
pub struct Section {
    /// Section identifier, e.g. [`crate::schema::SECTION_DIRECTORY_INDEX`]
    pub id: u32,
    /// Byte offset of the section payload
    pub offset: u32,
}

impl Section {
    /// Size of one section table record.
    pub const SIZE: usize = 8;

    /// Read the section record at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record does not fit.
    pub fn read(data: &[u8], offset: usize) -> Result<Section> {
        Ok(Section {
            id: read_ne::<u32>(data, offset)?,
            offset: read_ne::<u32>(data, offset + 4)?,
        })
    }
}
