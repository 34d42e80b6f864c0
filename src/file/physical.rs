//! Physical file backend for memory-mapped I/O.
//!
//! Maps a `.typelib` file read-only into the process's address space. Mapping
//! instead of reading keeps large typelibs out of the heap and lets the
//! operating system share the pages between every process that has the same
//! file open - the format is offset-addressed precisely so this works.

use super::Backend;
use crate::{
    Error::{Error, FileError},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A backend that memory-maps a typelib file from disk.
///
/// The mapping is read-only and shared. All access goes through the bounds-checked
/// [`crate::file::Backend`] methods.
///
/// # Examples
///
/// ```rust,ignore
/// use typescope::file::{Backend, Physical};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("Gtk-4.0.typelib"))?;
/// assert_eq!(&physical.data_slice(0, 4)?, b"TLIB");
/// # Ok::<(), typescope::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical backend by memory-mapping the specified file.
    ///
    /// # Arguments
    /// * `path` - Path to the typelib file on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error(error.to_string())),
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_file_roundtrip() {
        let temp_path = std::env::temp_dir().join("typescope_physical_test.typelib");
        std::fs::write(&temp_path, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE]).unwrap();

        let physical = Physical::new(&temp_path).unwrap();
        assert_eq!(physical.len(), 5);
        assert_eq!(physical.data_slice(1, 3).unwrap(), &[0xBB, 0xCC, 0xDD]);
        assert!(physical.data_slice(4, 2).is_err());
        assert!(physical.data_slice(usize::MAX, 1).is_err());

        std::fs::remove_file(&temp_path).unwrap();
    }

    #[test]
    fn missing_file() {
        let result = Physical::new("/nonexistent/path/to/file.typelib");
        assert!(matches!(result, Err(FileError(_))));
    }
}
