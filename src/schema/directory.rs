//! The typelib directory: 12-byte, 1-indexed entries naming every top-level entity.
//!
//! Local entries (defined in this typelib) strictly precede non-local entries
//! (defined in another namespace). For a local entry `offset` addresses the
//! entity's blob; for a non-local entry it addresses the string naming the
//! defining namespace, and resolution happens later through the repository.

use crate::{file::io::read_ne, Result};

/// Parsed view of one directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Raw blob type tag (validated separately; kept raw so the directory can
    /// be walked even while reporting a bad tag)
    pub blob_type: u16,
    /// Entry is defined in this typelib
    pub local: bool,
    /// String offset of the entry's name
    pub name: u32,
    /// Blob offset (local) or namespace string offset (non-local)
    pub offset: u32,
}

impl DirEntry {
    /// Size of one directory entry.
    pub const SIZE: usize = 12;

    /// Bit 0 of the second u16 marks the entry as local.
    const LOCAL_BIT: u16 = 1;

    /// Read the directory entry at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry does not fit in the buffer.
    pub fn read(data: &[u8], offset: usize) -> Result<DirEntry> {
        Ok(DirEntry {
            blob_type: read_ne::<u16>(data, offset)?,
            local: read_ne::<u16>(data, offset + 2)? & Self::LOCAL_BIT != 0,
            name: read_ne::<u32>(data, offset + 4)?,
            offset: read_ne::<u32>(data, offset + 8)?,
        })
    }
}
