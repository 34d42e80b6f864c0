//! All-or-nothing buffer validation.
//!
//! [`validate`] walks the entire typelib - header, directory, every entity
//! blob, every type descriptor, the attribute table and the section table -
//! and either accepts the whole buffer or rejects it with the first defect
//! found. Nothing downstream ever re-checks structure: the accessor layer is
//! built on the assumption that a validated buffer cannot make a read fail
//! except past-the-count index errors.
//!
//! # Architecture
//!
//! A [`Validator`] carries the buffer, the parsed header and a context stack
//! of entity names, so a defect deep inside a blob reports a path like
//! `object Window / method show`. The per-kind entity checks live in
//! `entities`, type descriptor rules in `types`; all offset arithmetic is
//! delegated to [`crate::schema::layout`], the same code the accessors use.
//!
//! # Validation order
//!
//! 1. Header: magic, exact major version, declared size against the buffer
//!    length, the declared-blob-size fingerprint, 4-byte alignment of every
//!    table offset
//! 2. Directory: bounds, local-entries-first partition, entry names, one
//!    recursive check per local entry
//! 3. Attribute table: bounds, name/value strings, ascending target offsets
//! 4. Section table: bounds and known-section payload offsets

mod entities;
mod types;

use crate::{
    file::io::read_cstr,
    schema::{
        header::{BlobSizes, Header, Section, HEADER_SIZE},
        AttributeBlob, BlobType, DirEntry, MAJOR_VERSION, MAX_NAME_LEN, SECTION_DIRECTORY_INDEX,
        TYPELIB_MAGIC,
    },
    Error, Result,
};

/// Validate a complete typelib buffer.
///
/// # Errors
/// Returns the first structural defect found; see [`crate::Error`] for the
/// format error taxonomy. A buffer that returns `Ok` is safe to hand to the
/// accessor layer.
pub fn validate(data: &[u8]) -> Result<()> {
    Validator::new(data)?.run()
}

/// Walks a buffer once, accumulating a context path for error messages.
pub(crate) struct Validator<'a> {
    pub(crate) data: &'a [u8],
    pub(crate) header: Header,
    context: Vec<String>,
}

impl<'a> Validator<'a> {
    fn new(data: &'a [u8]) -> Result<Validator<'a>> {
        if data.len() < HEADER_SIZE {
            return Err(Error::OutOfBounds);
        }
        if &data[..16] != TYPELIB_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let header = Header::read(data)?;
        Ok(Validator {
            data,
            header,
            context: Vec::new(),
        })
    }

    fn run(&mut self) -> Result<()> {
        self.check_header()?;
        self.check_directory()?;
        self.check_attributes()?;
        self.check_sections()?;
        Ok(())
    }

    /// The current context path, e.g. `object Window / method show`.
    pub(crate) fn path(&self) -> String {
        self.context.join(" / ")
    }

    pub(crate) fn push_context(&mut self, entry: String) {
        self.context.push(entry);
    }

    pub(crate) fn pop_context(&mut self) {
        self.context.pop();
    }

    fn check_header(&self) -> Result<()> {
        let header = &self.header;

        if header.major_version != MAJOR_VERSION {
            return Err(Error::InvalidVersion {
                major: header.major_version,
                minor: header.minor_version,
                expected: MAJOR_VERSION,
            });
        }

        if header.size as usize != self.data.len() {
            return Err(Error::SizeMismatch {
                context: "header.size",
                declared: header.size as usize,
                actual: self.data.len(),
            });
        }

        Self::check_blob_sizes(&header.blob_sizes)?;

        for offset in [header.directory, header.attributes, header.sections] {
            if offset % 4 != 0 {
                return Err(Error::MisalignedOffset(offset));
            }
        }

        if header.n_local_entries > header.n_entries {
            return Err(Error::InvalidDirectory(format!(
                "{} local entries declared but only {} entries total",
                header.n_local_entries, header.n_entries
            )));
        }

        let directory_end = (header.directory as usize)
            .checked_add(usize::from(header.n_entries) * DirEntry::SIZE)
            .ok_or(Error::OutOfBounds)?;
        if (header.directory as usize) < HEADER_SIZE || directory_end > self.data.len() {
            return Err(Error::InvalidDirectory(format!(
                "directory at 0x{:x} with {} entries does not fit the buffer",
                header.directory, header.n_entries
            )));
        }

        self.check_name(header.namespace)?;
        self.check_name(header.nsversion)?;
        if header.c_prefix != 0 {
            self.check_name(header.c_prefix)?;
        }
        if header.shared_library != 0 {
            self.check_string(header.shared_library)?;
        }
        if header.dependencies != 0 {
            let list = self.check_string(header.dependencies)?;
            for dependency in list.split('|') {
                if dependency.is_empty() || !dependency.bytes().all(is_name_byte) {
                    return Err(Error::InvalidName(format!(
                        "dependency list entry '{dependency}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Declared blob sizes are the format fingerprint: any disagreement with
    /// the compiled layout means an incompatible producer.
    fn check_blob_sizes(declared: &BlobSizes) -> Result<()> {
        let compiled = BlobSizes::compiled();

        #[rustfmt::skip]
        let fields: [(&'static str, u16, u16); 18] = [
            ("entry blob size",        declared.entry,        compiled.entry),
            ("function blob size",     declared.function,     compiled.function),
            ("callback blob size",     declared.callback,     compiled.callback),
            ("signal blob size",       declared.signal,       compiled.signal),
            ("vfunc blob size",        declared.vfunc,        compiled.vfunc),
            ("arg blob size",          declared.arg,          compiled.arg),
            ("property blob size",     declared.property,     compiled.property),
            ("field blob size",        declared.field,        compiled.field),
            ("value blob size",        declared.value,        compiled.value),
            ("attribute blob size",    declared.attribute,    compiled.attribute),
            ("constant blob size",     declared.constant,     compiled.constant),
            ("error domain blob size", declared.error_domain, compiled.error_domain),
            ("signature blob size",    declared.signature,    compiled.signature),
            ("enum blob size",         declared.enum_,        compiled.enum_),
            ("struct blob size",       declared.struct_,      compiled.struct_),
            ("object blob size",       declared.object,       compiled.object),
            ("interface blob size",    declared.interface,    compiled.interface),
            ("union blob size",        declared.union,        compiled.union),
        ];

        for (context, declared, actual) in fields {
            if declared != actual {
                return Err(Error::SizeMismatch {
                    context,
                    declared: declared.into(),
                    actual: actual.into(),
                });
            }
        }
        Ok(())
    }

    fn check_directory(&mut self) -> Result<()> {
        let n_entries = usize::from(self.header.n_entries);
        let n_local = usize::from(self.header.n_local_entries);
        let directory = self.header.directory as usize;

        for index in 0..n_entries {
            let entry = DirEntry::read(self.data, directory + index * DirEntry::SIZE)?;
            let name = self.check_name(entry.name)?.to_string();

            let blob_type = BlobType::parse(entry.blob_type).map_err(|_| {
                Error::InvalidDirectory(format!(
                    "entry {} '{}' has invalid blob type tag {}",
                    index + 1,
                    name,
                    entry.blob_type
                ))
            })?;

            if entry.local != (index < n_local) {
                return Err(Error::InvalidDirectory(format!(
                    "entry {} '{}' breaks the locals-first partition",
                    index + 1,
                    name
                )));
            }

            if entry.local {
                if entry.offset % 4 != 0 {
                    return Err(Error::MisalignedOffset(entry.offset));
                }
                if (entry.offset as usize) < HEADER_SIZE
                    || entry.offset as usize >= self.data.len()
                {
                    return Err(Error::InvalidDirectory(format!(
                        "entry {} '{}' points outside the buffer",
                        index + 1,
                        name
                    )));
                }
                self.check_entry_blob(blob_type, &name, entry.offset as usize)?;
            } else {
                // offset names the defining namespace
                self.check_name(entry.offset)?;
            }
        }

        Ok(())
    }

    fn check_attributes(&self) -> Result<()> {
        let n_attributes = self.header.n_attributes as usize;
        if n_attributes == 0 {
            return Ok(());
        }

        let table = self.header.attributes as usize;
        if table == 0 {
            return Err(malformed_error!(
                "{} attributes declared but the attribute table offset is 0",
                n_attributes
            ));
        }
        let end = table
            .checked_add(n_attributes * AttributeBlob::SIZE)
            .ok_or(Error::OutOfBounds)?;
        if table < HEADER_SIZE || end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        let mut previous_target = 0u32;
        for index in 0..n_attributes {
            let attribute = AttributeBlob::read(self.data, table + index * AttributeBlob::SIZE)?;

            if attribute.offset < previous_target {
                return Err(malformed_error!(
                    "attribute {} targets 0x{:x}, before the previous target 0x{:x} - table is not sorted",
                    index,
                    attribute.offset,
                    previous_target
                ));
            }
            previous_target = attribute.offset;

            if attribute.offset as usize >= self.data.len() {
                return Err(Error::OutOfBounds);
            }
            self.check_name(attribute.name)?;
            self.check_string(attribute.value)?;
        }

        Ok(())
    }

    fn check_sections(&self) -> Result<()> {
        if self.header.sections == 0 {
            return Ok(());
        }

        let mut pos = self.header.sections as usize;
        if pos < HEADER_SIZE {
            return Err(Error::OutOfBounds);
        }

        loop {
            let section = Section::read(self.data, pos)?;
            if section.id == 0 {
                return Ok(());
            }

            if section.offset % 4 != 0 {
                return Err(Error::MisalignedOffset(section.offset));
            }
            if section.offset as usize >= self.data.len() {
                return Err(Error::OutOfBounds);
            }
            if section.id == SECTION_DIRECTORY_INDEX {
                // structural minimum: the fixed index header must fit
                if section.offset as usize + 16 > self.data.len() {
                    return Err(Error::OutOfBounds);
                }
            }

            pos += Section::SIZE;
        }
    }

    /// Check a name string: NUL-terminated, non-empty, bounded length,
    /// identifier character set.
    pub(crate) fn check_name(&self, offset: u32) -> Result<&'a str> {
        let name = read_cstr(self.data, offset as usize)
            .map_err(|_| Error::InvalidName(format!("unterminated string at 0x{offset:x}")))?;

        if name.is_empty() {
            return Err(Error::InvalidName(format!("empty name at 0x{offset:x}")));
        }
        if name.len() >= MAX_NAME_LEN {
            return Err(Error::InvalidName(format!(
                "name at 0x{offset:x} exceeds {MAX_NAME_LEN} bytes"
            )));
        }
        if !name.bytes().all(is_name_byte) {
            return Err(Error::InvalidName(format!(
                "name '{name}' contains forbidden characters"
            )));
        }

        Ok(name)
    }

    /// Check an unconstrained string: NUL-terminated UTF-8 within bounds.
    pub(crate) fn check_string(&self, offset: u32) -> Result<&'a str> {
        read_cstr(self.data, offset as usize)
    }
}

/// The identifier character set names must draw from.
fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b':' | b'-')
}
