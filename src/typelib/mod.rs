//! The validated typelib container.
//!
//! A [`Typelib`] owns a buffer (mapped file or memory) that has passed
//! [`crate::validate::validate`], plus everything resolved out of the header
//! at load time: namespace identity, the dependency list, the shared-module
//! list and the location of the optional directory name index. It is the unit
//! of sharing - the accessor layer hands out infos that keep the container
//! alive through an `Arc`.
//!
//! # Key Components
//!
//! - [`Typelib::from_file`] / [`Typelib::from_bytes`] - Validate-then-load
//!   constructors; they fail closed on any structural defect
//! - [`Typelib::lookup_entry`] - Name lookup through the embedded perfect
//!   hash when present, with a linear directory scan as fallback
//! - [`Typelib::symbol`] - Lazy native symbol resolution over the declared
//!   shared modules
//!
//! Symbol resolution opens modules on first use, not at load time: most
//! consumers only ever read metadata, and a missing native module should not
//! prevent that.

mod loader;

pub use loader::{LoadedModule, ModuleLoader, NativeLoader};

use std::ffi::c_void;
use std::path::Path;
use std::sync::OnceLock;

use crate::{
    file::{io::read_cstr, Backend, Memory, Physical},
    hash::perfect_hash_search,
    schema::{
        header::{Header, Section},
        DirEntry, SECTION_DIRECTORY_INDEX,
    },
    validate::validate,
    Error, Result,
};

/// A dependency reference parsed from the header: namespace plus exact version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    /// The required namespace
    pub namespace: String,
    /// The required version, `"X.Y"`
    pub version: String,
}

/// A loaded, validated typelib buffer.
pub struct Typelib {
    backend: Box<dyn Backend>,
    header: Header,
    namespace: String,
    nsversion: String,
    dependencies: Vec<Dependency>,
    shared_library: Vec<String>,
    c_prefix: Option<String>,
    /// Byte offset of the directory-index section payload, when present
    index_offset: Option<usize>,
    loader: Box<dyn ModuleLoader>,
    /// Opened native modules, populated on first symbol request
    modules: OnceLock<Vec<Box<dyn LoadedModule>>>,
}

impl std::fmt::Debug for Typelib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typelib")
            .field("namespace", &self.namespace)
            .field("nsversion", &self.nsversion)
            .field("n_entries", &self.header.n_entries)
            .finish_non_exhaustive()
    }
}

impl Typelib {
    /// Map a typelib file and validate it.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be mapped, or any format error
    /// from validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Typelib> {
        Self::load(Box::new(Physical::new(path)?), Box::new(NativeLoader), true)
    }

    /// Take ownership of a buffer and validate it.
    ///
    /// # Errors
    /// Returns [`Error::Empty`] for an empty buffer, or any format error from
    /// validation.
    pub fn from_bytes(data: Vec<u8>) -> Result<Typelib> {
        Self::load(Box::new(Memory::new(data)?), Box::new(NativeLoader), true)
    }

    /// Take ownership of a buffer the caller asserts was already validated.
    ///
    /// Header parsing still happens; only the full structural walk is
    /// skipped. Meant for buffers just produced by a trusted compiler in the
    /// same process.
    ///
    /// # Errors
    /// Returns [`Error::Empty`] for an empty buffer or [`Error::OutOfBounds`]
    /// if not even a header fits.
    pub fn from_validated_bytes(data: Vec<u8>) -> Result<Typelib> {
        Self::load(Box::new(Memory::new(data)?), Box::new(NativeLoader), false)
    }

    /// [`Typelib::from_bytes`] with an injected module loader.
    pub fn from_bytes_with_loader(data: Vec<u8>, loader: Box<dyn ModuleLoader>) -> Result<Typelib> {
        Self::load(Box::new(Memory::new(data)?), loader, true)
    }

    fn load(
        backend: Box<dyn Backend>,
        loader: Box<dyn ModuleLoader>,
        run_validation: bool,
    ) -> Result<Typelib> {
        let data = backend.data();
        if run_validation {
            validate(data)?;
        }
        let header = Header::read(data)?;

        let namespace = read_cstr(data, header.namespace as usize)?.to_string();
        let nsversion = read_cstr(data, header.nsversion as usize)?.to_string();

        let dependencies = if header.dependencies != 0 {
            read_cstr(data, header.dependencies as usize)?
                .split('|')
                .filter_map(parse_dependency)
                .collect()
        } else {
            Vec::new()
        };

        let shared_library = if header.shared_library != 0 {
            read_cstr(data, header.shared_library as usize)?
                .split(',')
                .filter(|module| !module.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let c_prefix = if header.c_prefix != 0 {
            Some(read_cstr(data, header.c_prefix as usize)?.to_string())
        } else {
            None
        };

        let index_offset = Self::find_section(data, &header, SECTION_DIRECTORY_INDEX)?;

        Ok(Typelib {
            backend,
            header,
            namespace,
            nsversion,
            dependencies,
            shared_library,
            c_prefix,
            index_offset,
            loader,
            modules: OnceLock::new(),
        })
    }

    fn find_section(data: &[u8], header: &Header, id: u32) -> Result<Option<usize>> {
        if header.sections == 0 {
            return Ok(None);
        }

        let mut pos = header.sections as usize;
        loop {
            let section = Section::read(data, pos)?;
            if section.id == 0 {
                return Ok(None);
            }
            if section.id == id {
                return Ok(Some(section.offset as usize));
            }
            pos += Section::SIZE;
        }
    }

    /// The raw buffer.
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// The parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The namespace this typelib defines.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The namespace version, `"X.Y"`.
    pub fn nsversion(&self) -> &str {
        &self.nsversion
    }

    /// The namespaces this typelib requires, with exact versions.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// The declared native modules, in resolution order.
    pub fn shared_library(&self) -> &[String] {
        &self.shared_library
    }

    /// The C symbol prefix, when declared.
    pub fn c_prefix(&self) -> Option<&str> {
        self.c_prefix.as_deref()
    }

    /// Number of directory entries.
    pub fn n_entries(&self) -> u16 {
        self.header.n_entries
    }

    /// Number of leading local directory entries.
    pub fn n_local_entries(&self) -> u16 {
        self.header.n_local_entries
    }

    /// Read the NUL-terminated string at `offset`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] for an unterminated or out-of-buffer
    /// offset. Cannot happen for offsets taken from a validated buffer.
    pub fn string(&self, offset: u32) -> Result<&str> {
        read_cstr(self.data(), offset as usize)
    }

    /// Read the 1-based directory entry `index`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for index 0 or past the entry count.
    pub fn dir_entry(&self, index: u16) -> Result<DirEntry> {
        if index == 0 || index > self.header.n_entries {
            return Err(Error::IndexOutOfRange {
                index: usize::from(index),
                count: usize::from(self.header.n_entries),
            });
        }

        DirEntry::read(
            self.data(),
            self.header.directory as usize + usize::from(index - 1) * DirEntry::SIZE,
        )
    }

    /// Find the directory entry named `name`.
    ///
    /// Goes through the embedded perfect-hash index when the typelib carries
    /// one, re-checking the name it lands on; otherwise scans the directory.
    /// Returns the 1-based index and the entry.
    pub fn lookup_entry(&self, name: &str) -> Option<(u16, DirEntry)> {
        if let Some(index_offset) = self.index_offset {
            let blob = &self.data()[index_offset..];
            if let Some(index) = perfect_hash_search(blob, name) {
                if let Ok(entry) = self.dir_entry(index) {
                    if self.string(entry.name).is_ok_and(|found| found == name) {
                        return Some((index, entry));
                    }
                }
                // the index covers local names only; fall through for the rest
            }
        }

        for index in 1..=self.header.n_entries {
            let entry = self.dir_entry(index).ok()?;
            if self.string(entry.name).is_ok_and(|found| found == name) {
                return Some((index, entry));
            }
        }
        None
    }

    /// Resolve a native symbol from the declared shared modules.
    ///
    /// Modules are opened once, on the first call; a module that fails to
    /// open is logged and skipped. An empty module list searches the running
    /// process image instead.
    ///
    /// # Errors
    /// Returns [`Error::SymbolNotFound`] when no openable module exports the
    /// symbol.
    pub fn symbol(&self, name: &str) -> Result<*const c_void> {
        let modules = self.modules.get_or_init(|| self.open_modules());

        modules
            .iter()
            .find_map(|module| module.symbol(name))
            .ok_or_else(|| Error::SymbolNotFound(name.to_string()))
    }

    fn open_modules(&self) -> Vec<Box<dyn LoadedModule>> {
        if self.shared_library.is_empty() {
            return match self.loader.open_self() {
                Ok(module) => vec![module],
                Err(err) => {
                    log::warn!("{}: cannot open process image: {err}", self.namespace);
                    Vec::new()
                }
            };
        }

        let mut modules = Vec::with_capacity(self.shared_library.len());
        for name in &self.shared_library {
            match self.loader.open(name) {
                Ok(module) => modules.push(module),
                Err(err) => {
                    log::warn!("{}: skipping module '{name}': {err}", self.namespace);
                }
            }
        }
        modules
    }
}

/// Split `"Ns-X.Y"` at the last dash. Entries without a version are dropped;
/// the validator never lets one through.
fn parse_dependency(raw: &str) -> Option<Dependency> {
    let (namespace, version) = raw.rsplit_once('-')?;
    if namespace.is_empty() || version.is_empty() {
        return None;
    }
    Some(Dependency {
        namespace: namespace.to_string(),
        version: version.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_parsing() {
        assert_eq!(
            parse_dependency("GLib-2.0"),
            Some(Dependency {
                namespace: "GLib".to_string(),
                version: "2.0".to_string(),
            })
        );
        // dashes may appear in the namespace itself
        assert_eq!(
            parse_dependency("My-Lib-1.4"),
            Some(Dependency {
                namespace: "My-Lib".to_string(),
                version: "1.4".to_string(),
            })
        );
        assert_eq!(parse_dependency("NoVersion"), None);
        assert_eq!(parse_dependency("-1.0"), None);
        assert_eq!(parse_dependency("Ns-"), None);
    }
}
