//! In-memory buffer backend.
//!
//! Used when the typelib bytes were produced in-process (a compiler handing a
//! freshly built buffer to the registry, or a test crafting one) rather than
//! read from disk.

use super::Backend;
use crate::{Error::Empty, Result};

/// A backend that owns its typelib bytes on the heap.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a memory backend from an owned byte buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if the buffer is empty.
    pub fn new(data: Vec<u8>) -> Result<Memory> {
        if data.is_empty() {
            return Err(Empty);
        }

        Ok(Memory { data })
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
