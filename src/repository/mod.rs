//! The process-wide typelib registry.
//!
//! A [`Repository`] maps namespaces to loaded [`Typelib`]s, finds typelib
//! files on a search path, loads dependency closures, and answers reverse
//! lookups (runtime type name, error domain) across everything loaded.
//!
//! # Architecture
//!
//! - Loaded typelibs live in a `DashMap` keyed by namespace; lookups take no
//!   global lock
//! - The search path sits behind an `RwLock`: the `TYPELIB_PATH` environment
//!   variable (read once at construction) always comes first, programmatic
//!   prepends next, the built-in system directories last
//! - Reverse-lookup results are memoized in `DashMap` caches - the scans are
//!   linear over every loaded blob and the same tokens recur constantly
//!
//! One namespace, one version: a second `require` for an already-loaded
//! namespace either short-circuits (same or unspecified version) or fails
//! with [`Error::VersionConflict`]. Nothing is ever unloaded.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use typescope::Repository;
//!
//! let repository = Repository::new();
//! repository.prepend_search_path("/opt/myapp/typelibs");
//! let typelib = repository.require("Gtk", Some("4.0"))?;
//! let info = repository.find_by_name("Gtk", "Window").unwrap();
//! # Ok::<(), typescope::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use dashmap::DashMap;

use crate::{
    info::{EnumInfo, Info},
    schema::{BlobType, EnumBlob, InterfaceBlob, ObjectBlob, StructBlob, UnionBlob},
    typelib::Dependency,
    Error, Result, Typelib,
};

/// Environment variable overriding the search path, platform path-list
/// separated.
pub const TYPELIB_PATH_VAR: &str = "TYPELIB_PATH";

/// System directories searched after everything else.
#[cfg(unix)]
const DEFAULT_SEARCH_DIRS: &[&str] = &["/usr/local/lib/typelib-4.0", "/usr/lib/typelib-4.0"];
#[cfg(not(unix))]
const DEFAULT_SEARCH_DIRS: &[&str] = &[];

/// Non-local entry chains cross at most a handful of namespaces; deeper
/// means a reference cycle between typelibs.
const MAX_RESOLVE_HOPS: usize = 8;

/// Registry of loaded typelibs with search-path resolution.
pub struct Repository {
    /// `TYPELIB_PATH` entries, fixed at construction
    env_path: Vec<PathBuf>,
    /// Programmatic entries, newest first
    extra_path: RwLock<Vec<PathBuf>>,
    /// Loaded typelibs by namespace
    typelibs: DashMap<String, Arc<Typelib>>,
    /// Memoized runtime-type-name lookups
    runtime_type_cache: DashMap<String, Info>,
    /// Memoized error-domain lookups
    error_domain_cache: DashMap<String, EnumInfo>,
}

impl Repository {
    /// Create an isolated repository.
    pub fn new() -> Arc<Repository> {
        let env_path = std::env::var_os(TYPELIB_PATH_VAR)
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default();

        Arc::new(Repository {
            env_path,
            extra_path: RwLock::new(Vec::new()),
            typelibs: DashMap::new(),
            runtime_type_cache: DashMap::new(),
            error_domain_cache: DashMap::new(),
        })
    }

    /// The process-wide shared repository.
    pub fn default_instance() -> Arc<Repository> {
        static INSTANCE: OnceLock<Arc<Repository>> = OnceLock::new();
        Arc::clone(INSTANCE.get_or_init(Repository::new))
    }

    /// Add a directory searched before previous programmatic entries and the
    /// system directories. `TYPELIB_PATH` entries still come first.
    pub fn prepend_search_path<P: Into<PathBuf>>(&self, dir: P) {
        if let Ok(mut extra) = self.extra_path.write() {
            extra.insert(0, dir.into());
        }
    }

    fn search_dirs(&self, private: Option<&Path>) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        dirs.extend(self.env_path.iter().cloned());
        if let Some(dir) = private {
            dirs.push(dir.to_path_buf());
        }
        if let Ok(extra) = self.extra_path.read() {
            dirs.extend(extra.iter().cloned());
        }
        dirs.extend(DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from));
        dirs
    }

    /// Load a namespace, and transitively everything it depends on.
    ///
    /// Passing a version requires exactly that version; `None` picks the
    /// highest version found on the search path. When two directories carry
    /// the same highest version, the earliest directory wins.
    ///
    /// # Errors
    /// Returns [`Error::VersionConflict`] when a different version is already
    /// loaded, [`Error::TypelibNotFound`] when no file matches, or any
    /// validation error from loading.
    pub fn require(self: &Arc<Self>, namespace: &str, version: Option<&str>) -> Result<Arc<Typelib>> {
        self.require_inner(namespace, version, None)
    }

    /// Like [`Repository::require`], searching `dir` before the regular
    /// search path (but still after `TYPELIB_PATH`).
    ///
    /// # Errors
    /// Same as [`Repository::require`].
    pub fn require_private<P: AsRef<Path>>(
        self: &Arc<Self>,
        dir: P,
        namespace: &str,
        version: Option<&str>,
    ) -> Result<Arc<Typelib>> {
        self.require_inner(namespace, version, Some(dir.as_ref()))
    }

    fn require_inner(
        self: &Arc<Self>,
        namespace: &str,
        version: Option<&str>,
        private: Option<&Path>,
    ) -> Result<Arc<Typelib>> {
        if let Some(loaded) = self.typelibs.get(namespace) {
            return match version {
                Some(requested) if requested != loaded.nsversion() => Err(Error::VersionConflict {
                    namespace: namespace.to_string(),
                    loaded: loaded.nsversion().to_string(),
                    requested: requested.to_string(),
                }),
                _ => Ok(Arc::clone(loaded.value())),
            };
        }

        let path = self
            .find_typelib_file(namespace, version, private)
            .ok_or_else(|| Error::TypelibNotFound {
                namespace: namespace.to_string(),
                version: version.map(str::to_string),
            })?;

        let typelib = Typelib::from_file(&path)?;
        if typelib.namespace() != namespace {
            return Err(malformed_error!(
                "typelib file '{}' defines namespace '{}', expected '{}'",
                path.display(),
                typelib.namespace(),
                namespace
            ));
        }
        if let Some(requested) = version {
            if typelib.nsversion() != requested {
                return Err(Error::VersionConflict {
                    namespace: namespace.to_string(),
                    loaded: typelib.nsversion().to_string(),
                    requested: requested.to_string(),
                });
            }
        }

        // dependencies register before their dependents
        for dependency in typelib.dependencies().to_vec() {
            self.require_inner(&dependency.namespace, Some(&dependency.version), private)?;
        }

        let typelib = Arc::new(typelib);
        let registered = self
            .typelibs
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::clone(&typelib));
        log::debug!(
            "registered {}-{} from {}",
            namespace,
            registered.nsversion(),
            path.display()
        );
        Ok(Arc::clone(registered.value()))
    }

    /// Find `<namespace>-<version>.typelib` on the search path.
    fn find_typelib_file(
        &self,
        namespace: &str,
        version: Option<&str>,
        private: Option<&Path>,
    ) -> Option<PathBuf> {
        let dirs = self.search_dirs(private);

        if let Some(version) = version {
            let file_name = format!("{namespace}-{version}.typelib");
            return dirs
                .iter()
                .map(|dir| dir.join(&file_name))
                .find(|path| path.is_file());
        }

        // no version requested: pick the highest (major, minor) across all
        // directories; a strictly-greater comparison keeps the earliest
        // directory on ties
        let prefix = format!("{namespace}-");
        let mut best: Option<((u32, u32), PathBuf)> = None;
        for dir in &dirs {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(file_name) = file_name.to_str() else {
                    continue;
                };
                let Some(version) = file_name
                    .strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_suffix(".typelib"))
                    .and_then(parse_version)
                else {
                    continue;
                };

                if best.as_ref().map_or(true, |(current, _)| version > *current) {
                    best = Some((version, entry.path()));
                }
            }
        }
        best.map(|(_, path)| path)
    }

    /// Whether the namespace is loaded.
    pub fn is_registered(&self, namespace: &str) -> bool {
        self.typelibs.contains_key(namespace)
    }

    /// The namespaces currently loaded, in no particular order.
    pub fn loaded_namespaces(&self) -> Vec<String> {
        self.typelibs.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The loaded typelib for a namespace.
    pub fn get_typelib(&self, namespace: &str) -> Option<Arc<Typelib>> {
        self.typelibs
            .get(namespace)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// The loaded version of a namespace.
    pub fn version(&self, namespace: &str) -> Option<String> {
        self.typelibs
            .get(namespace)
            .map(|entry| entry.nsversion().to_string())
    }

    /// The dependency list of a loaded namespace.
    pub fn dependencies(&self, namespace: &str) -> Option<Vec<Dependency>> {
        self.typelibs
            .get(namespace)
            .map(|entry| entry.dependencies().to_vec())
    }

    /// The declared native modules of a loaded namespace.
    pub fn shared_library(&self, namespace: &str) -> Option<Vec<String>> {
        self.typelibs
            .get(namespace)
            .map(|entry| entry.shared_library().to_vec())
    }

    /// Find a top-level entity by namespace and name.
    ///
    /// Returns `None` when the namespace is not loaded or has no such entry.
    pub fn find_by_name(self: &Arc<Self>, namespace: &str, name: &str) -> Option<Info> {
        self.resolve_hops(namespace, name, 0)
    }

    /// Resolution entry point for non-local directory entries.
    pub(crate) fn resolve_remote(self: &Arc<Self>, namespace: &str, name: &str) -> Option<Info> {
        self.resolve_hops(namespace, name, 1)
    }

    fn resolve_hops(self: &Arc<Self>, namespace: &str, name: &str, hops: usize) -> Option<Info> {
        if hops > MAX_RESOLVE_HOPS {
            return None;
        }

        let typelib = self.get_typelib(namespace)?;
        let (_, entry) = typelib.lookup_entry(name)?;

        if entry.local {
            return Some(Info::from_local_entry(Arc::clone(self), typelib, &entry));
        }

        let next_namespace = typelib.string(entry.offset).ok()?.to_string();
        self.resolve_hops(&next_namespace, name, hops + 1)
    }

    /// Find an entity by its registered runtime type name.
    ///
    /// Tries each loaded typelib whose C prefix matches the token first, then
    /// falls back to scanning every local entry of every loaded typelib.
    /// Results are cached.
    pub fn find_by_runtime_type_name(self: &Arc<Self>, token: &str) -> Option<Info> {
        if let Some(hit) = self.runtime_type_cache.get(token) {
            return Some(hit.value().clone());
        }

        let found = self.scan_runtime_type_name(token)?;
        log::debug!("runtime type '{}' resolved to {}", token, found.name());
        self.runtime_type_cache
            .insert(token.to_string(), found.clone());
        Some(found)
    }

    fn scan_runtime_type_name(self: &Arc<Self>, token: &str) -> Option<Info> {
        // C-prefix heuristic: "GtkWindow" with prefix "Gtk" names "Window"
        for entry in self.typelibs.iter() {
            let typelib = entry.value();
            let Some(prefix) = typelib.c_prefix() else {
                continue;
            };
            let Some(name) = token.strip_prefix(prefix) else {
                continue;
            };
            if let Some((_, dir_entry)) = typelib.lookup_entry(name) {
                if dir_entry.local
                    && entry_runtime_type_name(typelib, &dir_entry) == Some(token)
                {
                    return Some(Info::from_local_entry(
                        Arc::clone(self),
                        Arc::clone(typelib),
                        &dir_entry,
                    ));
                }
            }
        }

        // fallback: exhaustive scan
        for entry in self.typelibs.iter() {
            let typelib = entry.value();
            for index in 1..=typelib.n_local_entries() {
                let Ok(dir_entry) = typelib.dir_entry(index) else {
                    continue;
                };
                if entry_runtime_type_name(typelib, &dir_entry) == Some(token) {
                    return Some(Info::from_local_entry(
                        Arc::clone(self),
                        Arc::clone(typelib),
                        &dir_entry,
                    ));
                }
            }
        }
        None
    }

    /// Find the enum modeling an error domain. Results are cached.
    pub fn find_by_error_domain(self: &Arc<Self>, domain: &str) -> Option<EnumInfo> {
        if let Some(hit) = self.error_domain_cache.get(domain) {
            return Some(hit.value().clone());
        }

        for entry in self.typelibs.iter() {
            let typelib = entry.value();
            for index in 1..=typelib.n_local_entries() {
                let Ok(dir_entry) = typelib.dir_entry(index) else {
                    continue;
                };
                if !matches!(
                    BlobType::from_repr(dir_entry.blob_type),
                    Some(BlobType::Enum) | Some(BlobType::Flags)
                ) {
                    continue;
                }

                let Ok(blob) = EnumBlob::read(typelib.data(), dir_entry.offset as usize) else {
                    continue;
                };
                if blob.error_domain == 0
                    || typelib
                        .string(blob.error_domain)
                        .map_or(true, |found| found != domain)
                {
                    continue;
                }

                let info = Info::from_local_entry(
                    Arc::clone(self),
                    Arc::clone(typelib),
                    &dir_entry,
                );
                if let Some(enum_info) = info.as_enum() {
                    log::debug!("error domain '{}' resolved to {}", domain, enum_info.name());
                    self.error_domain_cache
                        .insert(domain.to_string(), enum_info.clone());
                    return Some(enum_info.clone());
                }
            }
        }
        None
    }

    /// Register a typelib loaded by the caller (compiler output, tests).
    ///
    /// # Errors
    /// Returns [`Error::VersionConflict`] when a different version of the
    /// namespace is already loaded.
    pub fn register(self: &Arc<Self>, typelib: Typelib) -> Result<Arc<Typelib>> {
        let namespace = typelib.namespace().to_string();
        if let Some(loaded) = self.typelibs.get(&namespace) {
            if loaded.nsversion() != typelib.nsversion() {
                return Err(Error::VersionConflict {
                    namespace,
                    loaded: loaded.nsversion().to_string(),
                    requested: typelib.nsversion().to_string(),
                });
            }
            return Ok(Arc::clone(loaded.value()));
        }

        let typelib = Arc::new(typelib);
        self.typelibs
            .insert(namespace.clone(), Arc::clone(&typelib));
        log::debug!("registered {}-{}", namespace, typelib.nsversion());
        Ok(typelib)
    }
}

/// The runtime type name a local directory entry registers, when its blob
/// kind carries one.
fn entry_runtime_type_name<'a>(typelib: &'a Typelib, entry: &crate::schema::DirEntry) -> Option<&'a str> {
    let data = typelib.data();
    let offset = entry.offset as usize;

    let name_offset = match BlobType::from_repr(entry.blob_type)? {
        BlobType::Struct | BlobType::Boxed => StructBlob::read(data, offset).ok()?.gtype_name,
        BlobType::Enum | BlobType::Flags => EnumBlob::read(data, offset).ok()?.gtype_name,
        BlobType::Object => ObjectBlob::read(data, offset).ok()?.gtype_name,
        BlobType::Interface => InterfaceBlob::read(data, offset).ok()?.gtype_name,
        BlobType::Union => UnionBlob::read(data, offset).ok()?.gtype_name,
        _ => 0,
    };

    if name_offset == 0 {
        return None;
    }
    typelib.string(name_offset).ok()
}

/// Parse `"X.Y"` into a comparable (major, minor) pair.
fn parse_version(raw: &str) -> Option<(u32, u32)> {
    let (major, minor) = raw.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
