//! Native module loading for symbol resolution.
//!
//! A typelib declares the shared modules its symbols live in; resolving a
//! symbol means opening those modules and searching them in order. The
//! [`ModuleLoader`] trait is the seam: production code uses [`NativeLoader`]
//! (dlopen via `libloading`), tests inject a fake that never touches the
//! dynamic linker.

use std::ffi::c_void;

use crate::{Error, Result};

/// Opens native modules by name.
pub trait ModuleLoader: Send + Sync {
    /// Open the named shared module.
    ///
    /// # Errors
    /// Returns [`Error::LibraryLoad`] when the module cannot be opened.
    fn open(&self, module: &str) -> Result<Box<dyn LoadedModule>>;

    /// Open the running process image itself, for typelibs that declare no
    /// shared modules (statically linked or built-in namespaces).
    ///
    /// # Errors
    /// Returns [`Error::LibraryLoad`] when the process image cannot be opened.
    fn open_self(&self) -> Result<Box<dyn LoadedModule>>;
}

/// An opened module that can be searched for exported symbols.
pub trait LoadedModule: Send + Sync {
    /// Address of the named export, if this module has it.
    fn symbol(&self, name: &str) -> Option<*const c_void>;
}

/// The default loader, backed by the platform dynamic linker.
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn open(&self, module: &str) -> Result<Box<dyn LoadedModule>> {
        // Safety: loading a shared module runs its initializers; that is the
        // entire point of resolving symbols from a typelib's declared modules.
        let library = unsafe { libloading::Library::new(module) }.map_err(|err| {
            Error::LibraryLoad {
                module: module.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Box::new(NativeModule { library }))
    }

    #[cfg(unix)]
    fn open_self(&self) -> Result<Box<dyn LoadedModule>> {
        let library = libloading::os::unix::Library::this();
        Ok(Box::new(NativeModule {
            library: library.into(),
        }))
    }

    #[cfg(windows)]
    fn open_self(&self) -> Result<Box<dyn LoadedModule>> {
        let library =
            libloading::os::windows::Library::this().map_err(|err| Error::LibraryLoad {
                module: "<self>".to_string(),
                reason: err.to_string(),
            })?;
        Ok(Box::new(NativeModule {
            library: library.into(),
        }))
    }
}

struct NativeModule {
    library: libloading::Library,
}

impl LoadedModule for NativeModule {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        let mut bytes = Vec::with_capacity(name.len() + 1);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);

        // Safety: the symbol is only ever handed out as an opaque address;
        // casting it to a callable type is the caller's contract.
        unsafe {
            let symbol: libloading::Symbol<*const c_void> = self.library.get(&bytes).ok()?;
            Some(*symbol)
        }
    }
}
