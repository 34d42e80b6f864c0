//! Buffer abstraction for typelib data.
//!
//! A typelib can live in a memory-mapped file shared read-only between
//! processes, or in a heap buffer handed over by the caller. This module
//! abstracts over both through the [`crate::file::Backend`] trait so the rest
//! of the crate only ever sees bounds-checked byte slices.
//!
//! # Key Components
//!
//! - [`crate::file::Backend`] - Trait for typelib data sources
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend
//! - [`crate::file::memory::Memory`] - In-memory buffer backend
//! - [`crate::file::io`] - Native-byte-order primitive readers
//!
//! The backends are deliberately dumb: all format knowledge lives in
//! [`crate::schema`] and [`crate::validate`]. A [`crate::typelib::Typelib`]
//! owns one backend for its whole lifetime; info objects borrow slices out of
//! it and can never outlive it because they hold the owning `Arc`.

pub mod io;

mod memory;
mod physical;

pub use memory::Memory;
pub use physical::Physical;

use crate::{Error::OutOfBounds, Result};

/// Backend trait for typelib data sources.
///
/// This trait abstracts over the source of typelib bytes, allowing both in-memory and
/// memory-mapped representations. All implementations must be thread-safe: a validated
/// buffer is immutable and may be read concurrently without locking.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the buffer is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the requested range does not lie
    /// fully within the buffer.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if end > self.data().len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data()[offset..end])
    }
}
