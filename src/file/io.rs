//! Low-level byte order and safe reading utilities for typelib parsing.
//!
//! Typelibs are a native-byte-order format: a buffer is only valid on the
//! platform/ABI that produced it, so all primitive reads here use the host's
//! byte order. Every read is bounds-checked; there is no pointer arithmetic
//! and no transmuting of buffer memory anywhere in this crate.
//!
//! # Key Components
//!
//! - [`crate::file::io::TlbIO`] - Trait implemented by every primitive that can be read from a buffer
//! - [`crate::file::io::read_ne`] - Read a value at a fixed offset
//! - [`crate::file::io::read_ne_at`] - Read a value at an offset and advance the offset
//!
//! Both the validator and the accessor layer go exclusively through these
//! functions, which is what guarantees the two compute identical results for
//! the same buffer location.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use typescope::file::io::read_ne_at;
//!
//! let data = 42u32.to_ne_bytes();
//! let mut offset = 0;
//! let value: u32 = read_ne_at(&data, &mut offset)?;
//! assert_eq!(value, 42);
//! assert_eq!(offset, 4);
//! # Ok::<(), typescope::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Result`] and fail with [`crate::Error::OutOfBounds`]
//! when the buffer does not hold enough bytes for the requested type.

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be read from a typelib buffer in native byte order.
///
/// Implemented for the unsigned and signed integers up to 64 bits. The typelib format
/// never stores floating point values directly (constants carry their literal bytes),
/// so no float implementations are provided.
pub trait TlbIO: Sized + Copy {
    /// Number of bytes this type occupies in the buffer.
    const SIZE: usize;

    /// Converts a native-byte-order byte array into the value.
    ///
    /// The slice is guaranteed by the callers in this module to hold exactly
    /// [`Self::SIZE`] bytes.
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_tlb_io {
    ($($t:ty),*) => {
        $(
            impl TlbIO for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut array = [0u8; std::mem::size_of::<$t>()];
                    array.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(array)
                }
            }
        )*
    };
}

impl_tlb_io!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Read a value of type `T` at `offset` without advancing.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `T::SIZE` bytes are available
/// at `offset`.
pub fn read_ne<T: TlbIO>(data: &[u8], offset: usize) -> Result<T> {
    let Some(end) = offset.checked_add(T::SIZE) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    Ok(T::from_ne_slice(&data[offset..end]))
}

/// Read a value of type `T` at `*offset` and advance `*offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `T::SIZE` bytes are available.
pub fn read_ne_at<T: TlbIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let value = read_ne::<T>(data, *offset)?;
    *offset += T::SIZE;

    Ok(value)
}

/// Read the NUL-terminated UTF-8 string at `offset`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if no NUL terminator exists inside
/// the buffer, or [`crate::Error::Malformed`] if the bytes are not UTF-8.
pub fn read_cstr(data: &[u8], offset: usize) -> Result<&str> {
    let tail = data.get(offset..).ok_or(OutOfBounds)?;
    let end = tail.iter().position(|&b| b == 0).ok_or(OutOfBounds)?;

    std::str::from_utf8(&tail[..end])
        .map_err(|_| malformed_error!("Non-UTF-8 string at offset {}", offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_primitives() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x1122u16.to_ne_bytes());
        data.extend_from_slice(&0x33445566u32.to_ne_bytes());
        data.extend_from_slice(&(-7i8 as u8).to_ne_bytes());

        let mut offset = 0;
        assert_eq!(read_ne_at::<u16>(&data, &mut offset).unwrap(), 0x1122);
        assert_eq!(read_ne_at::<u32>(&data, &mut offset).unwrap(), 0x33445566);
        assert_eq!(read_ne_at::<i8>(&data, &mut offset).unwrap(), -7);
        assert_eq!(offset, 7);
    }

    #[test]
    fn read_out_of_bounds() {
        let data = [0u8; 3];
        assert!(read_ne::<u32>(&data, 0).is_err());
        assert!(read_ne::<u16>(&data, 2).is_err());
        assert!(read_ne::<u8>(&data, 3).is_err());
        assert!(read_ne::<u8>(&data, usize::MAX).is_err());
    }

    #[test]
    fn read_at_fixed_position() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD];
        assert_eq!(read_ne::<u8>(&data, 2).unwrap(), 0xCC);
        // Fixed-position read does not consume
        assert_eq!(read_ne::<u8>(&data, 2).unwrap(), 0xCC);
    }

    #[test]
    fn cstr() {
        let data = b"abc\0def\0";
        assert_eq!(read_cstr(data, 0).unwrap(), "abc");
        assert_eq!(read_cstr(data, 4).unwrap(), "def");
        assert_eq!(read_cstr(data, 3).unwrap(), "");
        assert!(read_cstr(b"no terminator", 0).is_err());
        assert!(read_cstr(data, 100).is_err());
        assert!(read_cstr(&[0xFF, 0xFE, 0x00], 0).is_err());
    }
}
