use thiserror::Error;

use crate::schema::BlobType;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into four groups that callers typically handle differently:
///
/// # Error Categories
///
/// ## Format Errors
/// Produced by the validator when a buffer is corrupt, truncated, or incompatible. A typelib
/// that fails validation must not be used; these are never partial.
/// - [`Error::InvalidMagic`] - Buffer does not start with the typelib magic
/// - [`Error::InvalidVersion`] - Major format version is not supported
/// - [`Error::SizeMismatch`] - Declared size disagrees with the buffer length
/// - [`Error::MisalignedOffset`] - A table offset violates 4-byte alignment
/// - [`Error::OutOfBounds`] - A read would have crossed the buffer boundary
/// - [`Error::InvalidDirectory`] - Directory entry counts or partitioning is wrong
/// - [`Error::InvalidName`] - A name string is unterminated or uses forbidden characters
/// - [`Error::Malformed`] - Catch-all for structural corruption, with source location
///
/// ## Resolution Errors
/// Produced by the repository when a namespace cannot be located or conflicts with
/// already-loaded state.
/// - [`Error::TypelibNotFound`] - No matching file on the search path
/// - [`Error::VersionConflict`] - A different version of the namespace is already loaded
///
/// ## Symbol Errors
/// - [`Error::LibraryLoad`] - A declared native module could not be opened
/// - [`Error::SymbolNotFound`] - No loaded module exports the requested symbol
///
/// ## Usage Errors
/// Checked failures for API misuse; never undefined behavior.
/// - [`Error::WrongInfoKind`] - A typed accessor was invoked on a different blob kind
/// - [`Error::IndexOutOfRange`] - A child index exceeds the declared count
#[derive(Error, Debug)]
pub enum Error {
    /// The buffer does not begin with the 16-byte typelib magic.
    #[error("Buffer does not start with the typelib magic")]
    InvalidMagic,

    /// The major format version of the buffer is not the one this implementation reads.
    ///
    /// Minor versions above the supported one are accepted (forward-compatible minor
    /// parsing); major versions must match exactly.
    #[error("Typelib version {major}.{minor} is not supported (expected major version {expected})")]
    InvalidVersion {
        /// Major version found in the header
        major: u8,
        /// Minor version found in the header
        minor: u8,
        /// Major version this implementation supports
        expected: u8,
    },

    /// The size recorded in the header does not equal the buffer length, or a declared
    /// blob size does not match this implementation's compiled layout.
    #[error("Size mismatch - {context}: declared {declared}, actual {actual}")]
    SizeMismatch {
        /// What was being measured (e.g. "header.size", "function blob")
        context: &'static str,
        /// The size recorded in the buffer
        declared: usize,
        /// The size this implementation requires
        actual: usize,
    },

    /// A header table offset is not 4-byte aligned.
    #[error("Misaligned offset 0x{0:x} (4-byte alignment required)")]
    MisalignedOffset(u32),

    /// An out of bound access was attempted while reading the buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The directory violates its structural invariants.
    #[error("Invalid directory - {0}")]
    InvalidDirectory(String),

    /// A name string is unterminated, too long, or contains forbidden characters.
    #[error("Invalid name - {0}")]
    InvalidName(String),

    /// The buffer is damaged and could not be parsed.
    ///
    /// Carries the context path built by the validator (e.g. "object Window / method show")
    /// plus the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// No `<namespace>-<version>.typelib` file was found on the search path.
    #[error("Typelib file for namespace '{namespace}'{} was not found on the search path",
        match .version { Some(v) => format!(" version '{v}'"), None => String::new() })]
    TypelibNotFound {
        /// The namespace that was requested
        namespace: String,
        /// The version that was requested, if any
        version: Option<String>,
    },

    /// A different version of the namespace is already registered.
    #[error("Namespace '{namespace}' version '{loaded}' is already loaded, requested '{requested}'")]
    VersionConflict {
        /// The conflicting namespace
        namespace: String,
        /// The version already registered
        loaded: String,
        /// The version that was requested
        requested: String,
    },

    /// A native module declared by a typelib could not be opened.
    #[error("Failed to load native module '{module}': {reason}")]
    LibraryLoad {
        /// The module name from the shared-library list
        module: String,
        /// The loader's failure message
        reason: String,
    },

    /// No loaded native module exports the requested symbol.
    #[error("Symbol '{0}' was not found in any declared module")]
    SymbolNotFound(String),

    /// A typed accessor was invoked on an info of a different kind.
    #[error("Wrong info kind: expected {expected}, found {actual}")]
    WrongInfoKind {
        /// The blob kind the accessor requires
        expected: BlobType,
        /// The blob kind actually present
        actual: BlobType,
    },

    /// A child index exceeds the declared count of the containing blob.
    #[error("Index {index} out of range (count is {count})")]
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// The declared element count
        count: usize,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
