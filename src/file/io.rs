//! Low-level byte order and safe reading/writing utilities for container parsing.
//!
//! This module provides endian-aware, bounds-checked reading and writing of fixed-width
//! integers from/to byte buffers. ELF containers carry their byte order in the identification
//! block, so most callers go through [`crate::file::io::read_at`] / [`crate::file::io::write_at`]
//! with an [`crate::file::io::Endian`] taken from the container; the module family and the
//! compressed-section envelope use the fixed-order helpers directly.
//!
//! # Key Components
//!
//! - [`crate::file::io::ByteIO`] - Trait implemented for all primitive integers we decode
//! - [`crate::file::io::read_le_at`] / [`crate::file::io::read_be_at`] - Fixed-order reads with auto-advance
//! - [`crate::file::io::read_at`] - Byte-order-selected read with auto-advance
//! - [`crate::file::io::write_at`] - Byte-order-selected write, used when applying relocations
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::OutOfBounds`] if there are insufficient bytes in the
//! buffer to complete the operation. Offsets are only advanced on success.
//!
//! # Examples
//!
//! ```rust,ignore
//! use binscope::file::io::{read_le_at, read_be_at};
//!
//! let data = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02];
//! let mut offset = 0;
//! let first: u32 = read_le_at(&data, &mut offset)?;
//! let second: u32 = read_be_at(&data, &mut offset)?;
//! assert_eq!((first, second), (1, 2));
//! # Ok::<(), binscope::Error>(())
//! ```

use crate::Result;

/// Byte order of a container or of a single structure inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl Endian {
    /// Returns `true` for [`Endian::Little`].
    #[must_use]
    pub fn is_little(self) -> bool {
        self == Endian::Little
    }
}

impl From<Endian> for scroll::Endian {
    fn from(endian: Endian) -> Self {
        match endian {
            Endian::Little => scroll::Endian::Little,
            Endian::Big => scroll::Endian::Big,
        }
    }
}

/// Trait for implementing type-specific safe binary data reading and writing.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait ByteIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]> + AsRef<[u8]>;

    /// Read this type from its little-endian byte representation.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read this type from its big-endian byte representation.
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Convert this value to its little-endian byte representation.
    fn to_le_bytes(self) -> Self::Bytes;
    /// Convert this value to its big-endian byte representation.
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_byte_io {
    ($($ty:ty),*) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64);

fn take<'a, T: ByteIO>(data: &'a [u8], offset: &usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let slice: &'a [u8] = &data[*offset..end];
    slice.try_into().map_err(|_| out_of_bounds_error!())
}

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is shorter than `size_of::<T>()`.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a little-endian value at `offset`, advancing the offset on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed the buffer.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_le_bytes(bytes))
}

/// Safely reads a value of type `T` in big-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is shorter than `size_of::<T>()`.
pub fn read_be<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a big-endian value at `offset`, advancing the offset on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed the buffer.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_be_bytes(bytes))
}

/// Reads a value in the given byte order at `offset`, advancing the offset on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed the buffer.
pub fn read_at<T: ByteIO>(data: &[u8], offset: &mut usize, endian: Endian) -> Result<T> {
    match endian {
        Endian::Little => read_le_at(data, offset),
        Endian::Big => read_be_at(data, offset),
    }
}

/// Writes a value in the given byte order at `offset`, advancing the offset on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the write would exceed the buffer.
pub fn write_at<T: ByteIO>(
    data: &mut [u8],
    offset: &mut usize,
    value: T,
    endian: Endian,
) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let bytes = match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    };
    data[*offset..end].copy_from_slice(bytes.as_ref());
    *offset = end;

    Ok(())
}
