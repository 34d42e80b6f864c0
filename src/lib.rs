// Copyright 2025 The typescope developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory
// - 'typelib/loader.rs' opens native modules and reads raw symbol addresses

//! # typescope
//!
//! A reader and runtime registry for binary typelib files: compact,
//! memory-mappable reflection metadata describing the API surface of a native
//! library - its functions, callbacks, structs, enums, objects, interfaces,
//! unions and constants.
//!
//! ## Features
//!
//! - **All-or-nothing validation** - Every structural claim a buffer makes is
//!   checked up front; after validation, accessors are infallible
//! - **Memory-mapped access** - Typelibs load through `mmap` with
//!   reference-based parsing and no per-entity allocation
//! - **Perfect-hash name lookup** - An embedded minimal perfect hash resolves
//!   directory names in constant time, with a linear scan fallback
//! - **Cross-namespace resolution** - A process-wide repository loads
//!   dependency closures and resolves references between typelibs
//! - **Lazy native binding** - Shared modules open on first symbol request,
//!   never at load time
//!
//! ## Quick Start
//!
//! Add `typescope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! typescope = "0.1"
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use typescope::Repository;
//!
//! // Load a namespace and everything it depends on
//! let repository = Repository::new();
//! repository.prepend_search_path("demos/typelibs");
//! let typelib = repository.require("Gtk", Some("4.0"))?;
//! println!("{} entries", typelib.n_entries());
//!
//! // Look up an entity by name
//! if let Some(info) = repository.find_by_name("Gtk", "Window") {
//!     println!("{} is a {}", info.name(), info.kind());
//! }
//! # Ok::<(), typescope::Error>(())
//! ```
//!
//! ### Inspecting a Single File
//!
//! ```rust,no_run
//! use typescope::{Repository, Typelib};
//!
//! let typelib = Typelib::from_file("demos/typelibs/Gtk-4.0.typelib")?;
//! let repository = Repository::new();
//! let typelib = repository.register(typelib)?;
//!
//! for index in 1..=typelib.n_local_entries() {
//!     let entry = typelib.dir_entry(index)?;
//!     println!("{}", typelib.string(entry.name)?);
//! }
//! # Ok::<(), typescope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `typescope` is organized into several key modules:
//!
//! - [`schema`] - The binary layout: header, directory, entity blobs, type
//!   descriptors and the shared trailing-array arithmetic
//! - [`validate`] - The structural walk that accepts or rejects a buffer
//! - [`typelib`] - The validated container: [`Typelib`]
//! - [`info`] - Typed read-only accessors: [`Info`] and the per-kind infos
//! - [`repository`] - The process-wide registry: [`Repository`]
//! - [`hash`] - The embedded minimal-perfect-hash index
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Trust Boundary
//!
//! The crate has exactly one trust decision: [`validate::validate`]. A buffer
//! that passes it is immutable for its lifetime (buffers are owned or mapped
//! read-only), so the accessor layer reads without re-checking structure.
//! Accessors are fallible only at the API edges - child lookups past a
//! declared count and cross-namespace references.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with detailed error
//! information:
//!
//! ```rust,no_run
//! use typescope::{Error, Typelib};
//!
//! match Typelib::from_file("demos/typelibs/Gtk-4.0.typelib") {
//!     Ok(typelib) => println!("{} loaded", typelib.namespace()),
//!     Err(Error::InvalidMagic) => println!("not a typelib"),
//!     Err(Error::Malformed { message, .. }) => println!("malformed: {}", message),
//!     Err(e) => println!("error: {}", e),
//! }
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// The embedded minimal-perfect-hash directory index.
///
/// Build side ([`hash::PerfectHashBuilder`]) packs a name-to-index map into a
/// flat byte blob; search side ([`hash::perfect_hash_search`]) evaluates it
/// with three hash probes and two rank lookups, no allocation.
pub mod hash;

/// Typed read-only accessors over validated typelib buffers.
///
/// # Key Types
///
/// - [`Info`] - Kind-tagged handle to any top-level entity
/// - [`info::FunctionInfo`], [`info::SignatureInfo`], [`info::ArgInfo`] -
///   Callables and their arguments
/// - [`info::StructInfo`], [`info::EnumInfo`], [`info::ObjectInfo`],
///   [`info::InterfaceInfo`], [`info::UnionInfo`] - Containers and their
///   children
/// - [`info::TypeInfo`] - Decoded type descriptors
pub mod info;

/// The process-wide typelib registry.
///
/// # Key Types
///
/// - [`Repository`] - Loads typelibs off a search path, tracks one version
///   per namespace, resolves names and runtime type names across everything
///   loaded
pub mod repository;

/// Binary schema of the typelib format: header, directory, blobs, type
/// descriptors.
pub mod schema;

/// The validated typelib container and native module loading.
pub mod typelib;

/// The all-or-nothing structural validator.
pub mod validate;

/// `typescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `typescope` Error type
///
/// The main error type for all operations in this crate. Covers format
/// validation, search-path resolution, version conflicts and native symbol
/// lookup.
pub use error::Error;

/// Kind-tagged handle to any top-level entity of a loaded typelib.
///
/// See [`info::Info`] for the per-kind downcasts.
pub use info::Info;

/// The process-wide typelib registry.
///
/// See [`repository::Repository`] for loading and lookup operations.
pub use repository::Repository;

/// A loaded, validated typelib buffer.
///
/// See [`typelib::Typelib`] for the container API.
pub use typelib::Typelib;
