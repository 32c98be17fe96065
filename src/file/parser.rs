//! Low-level byte stream parser for container decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used to walk the module family's chunk stream, decode LEB128 variable-length integers
//! and length-prefixed names, and pull null-terminated strings out of string tables.
//!
//! # Architecture
//!
//! The parser is built around a simple cursor-based model that maintains a position within
//! a byte slice:
//!
//! - **Position tracking** - Maintains current offset for sequential parsing operations
//! - **Bounds checking** - All operations validate data availability before reading
//! - **Zero-copy** - Byte ranges are handed out as sub-slices of the input
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_be`] - Read primitive types (big-endian)
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a fixed-size byte range
//!
//! ## Varint Codec
//! - [`crate::file::parser::Parser::read_uleb128`] - Unsigned LEB128, capped at 64 bits
//! - [`crate::file::parser::Parser::read_sleb128`] - Signed LEB128, capped at 64 bits
//! - [`crate::file::parser::Parser::read_prefixed_string_utf8`] - ULEB128 length-prefixed UTF-8
//! - [`crate::file::parser::Parser::read_string_utf8`] - Null-terminated UTF-8
//!
//! # Usage Examples
//!
//! ```rust
//! use binscope::Parser;
//!
//! // ULEB128 624485, then the name "abc"
//! let data = [0xE5, 0x8E, 0x26, 0x03, b'a', b'b', b'c'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_uleb128()?, 624_485);
//! assert_eq!(parser.read_prefixed_string_utf8()?, "abc");
//! assert!(!parser.has_more_data());
//! # Ok::<(), binscope::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, read_le_at, ByteIO},
    Result,
};

/// A cursor over a byte slice with bounds-checked reads.
///
/// The parser never reads past the end of its slice: every read validates the remaining
/// length first and fails with [`crate::Error::OutOfBounds`] otherwise. Failed reads leave
/// the position unchanged unless noted.
///
/// # Examples
///
/// ```rust
/// use binscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// assert_eq!(parser.read_be::<u16>()?, 0x0708);
/// # Ok::<(), binscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining from the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns the unread tail of the buffer.
    #[must_use]
    pub fn remaining_data(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed; it leaves nothing to read.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.ensure_remaining(step)?;
        self.position += step;
        Ok(())
    }

    /// Ensures that at least `needed` bytes are available from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `needed` bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(out_of_bounds_error!());
        }
        Ok(())
    }

    /// Read a type `T` from the current position in little-endian format.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a type `T` from the current position in big-endian format.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_be<T: ByteIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(len)?;

        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Read an unsigned LEB128 variable-length integer.
    ///
    /// Each byte contributes its low 7 bits, least significant group first; a clear high bit
    /// terminates the sequence. Encodings that would not fit into 64 bits are rejected instead
    /// of silently overflowing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends before a terminating byte, or
    /// [`crate::Error::Malformed`] if the value exceeds 64 bits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use binscope::Parser;
    ///
    /// let mut parser = Parser::new(&[0x80, 0x01]);
    /// assert_eq!(parser.read_uleb128()?, 128);
    ///
    /// let mut truncated = Parser::new(&[0xFF, 0xFF]);
    /// assert!(truncated.read_uleb128().is_err());
    /// # Ok::<(), binscope::Error>(())
    /// ```
    pub fn read_uleb128(&mut self) -> Result<u64> {
        let mut value = 0_u64;
        let mut shift = 0_u32;

        loop {
            let byte = self.read_le::<u8>()?;
            let payload = u64::from(byte & 0x7F);

            // Only a single bit of the tenth byte still fits into a u64
            if shift == 63 && payload > 1 {
                return Err(malformed_error!(
                    "ULEB128 overflow: value exceeds 64 bits at offset {}",
                    self.position - 1
                ));
            }

            value |= payload << shift;
            if (byte & 0x80) == 0 {
                break;
            }

            shift += 7;
            if shift >= 64 {
                return Err(malformed_error!(
                    "ULEB128 overflow: encoding longer than 10 bytes at offset {}",
                    self.position
                ));
            }
        }

        Ok(value)
    }

    /// Read a signed LEB128 variable-length integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends before a terminating byte, or
    /// [`crate::Error::Malformed`] if the value exceeds 64 bits.
    pub fn read_sleb128(&mut self) -> Result<i64> {
        let mut value = 0_i64;
        let mut shift = 0_u32;

        let byte = loop {
            let byte = self.read_le::<u8>()?;

            if shift == 63 && byte != 0x00 && byte != 0x7F {
                return Err(malformed_error!(
                    "SLEB128 overflow: value exceeds 64 bits at offset {}",
                    self.position - 1
                ));
            }

            value |= i64::from(byte & 0x7F) << shift;
            shift += 7;
            if (byte & 0x80) == 0 {
                break byte;
            }

            if shift >= 64 {
                return Err(malformed_error!(
                    "SLEB128 overflow: encoding longer than 10 bytes at offset {}",
                    self.position
                ));
            }
        };

        if shift < 64 && (byte & 0x40) != 0 {
            value |= -1_i64 << shift;
        }

        Ok(value)
    }

    /// Read a ULEB128 length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer bytes remain than declared, or
    /// [`crate::Error::Malformed`] for an overlong length or invalid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let declared = self.read_uleb128()?;
        let Ok(length) = usize::try_from(declared) else {
            self.position = start;
            return Err(out_of_bounds_error!());
        };

        let bytes = match self.read_bytes(length) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.position = start;
                return Err(error);
            }
        };

        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| malformed_error!("Invalid UTF-8 name at offset {}: {}", start, e))
    }

    /// Read a UTF-8 encoded null-terminated string.
    ///
    /// Reads bytes from the current position until a null terminator (0x00) is found. A string
    /// running to the end of the data without terminator is accepted. The position is advanced
    /// past the terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 encoding.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        Ok(self.read_str_utf8()?.to_string())
    }

    /// Zero-copy variant of [`Parser::read_string_utf8`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 encoding.
    pub fn read_str_utf8(&mut self) -> Result<&'a str> {
        let start = self.position.min(self.data.len());
        let end = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.data.len(), |p| start + p);

        let string = std::str::from_utf8(&self.data[start..end])
            .map_err(|e| malformed_error!("Invalid UTF-8 string at offset {}: {}", start, e))?;

        self.position = if end < self.data.len() { end + 1 } else { end };
        Ok(string)
    }
}
